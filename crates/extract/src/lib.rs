//! Dependency extraction for script and style sources.
//!
//! A source declares the files it depends on inline, with one quoted path
//! per declaration:
//!
//! ```text
//! depends("lib/widget.js");          // scripts
//! @depends "../theme/base.css";      /* styles */
//! ```
//!
//! [`Extractor`] finds those declarations per kind, and [`resolve`] turns
//! each one into the canonical absolute path that identifies a source.

mod consts;
pub mod error;
mod resolve;
mod rules;

pub use crate::consts::{
    FALLBACK_CONTENT_TYPE, LEAF_KINDS, SCRIPT, SCRIPT_PATTERN, STYLE, STYLE_PATTERN, content_type,
};
pub use crate::resolve::{canonicalize, kind_of, parent, resolve};
pub use crate::rules::{Extractor, Rule, UnknownKind};

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(".js", "text/javascript; charset=utf-8")]
    #[case(".CSS", "text/css; charset=utf-8")]
    #[case(".png", "image/png")]
    fn test_content_type(#[case] kind: &str, #[case] expected: &str) {
        assert_eq!(content_type(kind), Some(expected));
    }

    #[test]
    fn test_content_type_unknown() {
        assert_eq!(content_type(".nope"), None);
        assert_eq!(content_type(""), None);
    }
}
