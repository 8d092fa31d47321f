//! HTML tags that pull a source into a host page.

use crate::source::Source;
use livepkg_extract::{FALLBACK_CONTENT_TYPE, SCRIPT, STYLE, content_type};
use serde::Serialize;
use std::fmt::Write;

/// One source as a host page would reference it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Include {
    /// Extension including the leading dot.
    pub ext: String,
    /// URL path.
    pub path: String,
}

impl From<&Source> for Include {
    fn from(source: &Source) -> Self {
        Self {
            ext: source.ext.clone(),
            path: source.path.clone(),
        }
    }
}

impl Include {
    /// The tag for this include, with the path percent-escaped.
    pub fn tag(&self) -> String {
        let href = escape_path(&self.path);
        match self.ext.to_ascii_lowercase().as_str() {
            SCRIPT => format!(r#"<script src="{href}" type="text/javascript" >"#),
            STYLE => format!(r#"<link href="{href}" rel="stylesheet">"#),
            ext => {
                let mime = content_type(ext).unwrap_or(FALLBACK_CONTENT_TYPE);
                format!(r#"<link href="{href}" type="{mime}">"#)
            },
        }
    }
}

/// Percent-encode everything that is not allowed verbatim in a URL path.
///
/// Unreserved characters, `/` and the sub-delimiters that are harmless
/// inside a double-quoted attribute are kept; `'` and `&` are encoded along
/// with everything else.
fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => escaped.push(byte as char),
            b'/' | b'=' | b':' | b'@' | b'!' | b'$' | b'(' | b')' | b'*' | b'+' | b',' | b';' => {
                escaped.push(byte as char)
            },
            _ => {
                // Writing to a String cannot fail.
                let _ = write!(escaped, "%{byte:02X}");
            },
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn include(ext: &str, path: &str) -> Include {
        Include {
            ext: ext.to_string(),
            path: path.to_string(),
        }
    }

    #[rstest]
    #[case(".js", "/ui/main.js", r#"<script src="/ui/main.js" type="text/javascript" >"#)]
    #[case(".css", "/ui/main.css", r#"<link href="/ui/main.css" rel="stylesheet">"#)]
    #[case(".png", "/img/logo.png", r#"<link href="/img/logo.png" type="image/png">"#)]
    #[case(".bin", "/blob.bin", r#"<link href="/blob.bin" type="application/octet-stream">"#)]
    #[case(
        ".js",
        "/<script>=</script>.js",
        r#"<script src="/%3Cscript%3E=%3C/script%3E.js" type="text/javascript" >"#
    )]
    #[case(".css", "/a \"b\".css", r#"<link href="/a%20%22b%22.css" rel="stylesheet">"#)]
    fn test_tag(#[case] ext: &str, #[case] path: &str, #[case] expected: &str) {
        assert_eq!(include(ext, path).tag(), expected);
    }

    #[rstest]
    #[case("/ü.js", "/%C3%BC.js")]
    #[case("/100%.css", "/100%25.css")]
    #[case("/a&b'c.js", "/a%26b%27c.js")]
    fn test_escape_path(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(escape_path(path), expected);
    }
}
