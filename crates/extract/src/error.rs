//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No extraction rule (and no leaf declaration) exists for this kind.
    #[display("unknown file kind: {_0:?}")]
    UnknownFileKind(#[error(not(source))] String),
    /// A configured rule does not compile, or does not capture exactly one
    /// path per occurrence.
    #[display("invalid pattern for kind {kind:?}: {pattern}")]
    InvalidPattern {
        /// The kind the rule was configured for.
        kind: String,
        /// The offending pattern.
        pattern: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Content either declares its dependencies in a known syntax or it
        // doesn't; reading it again changes nothing.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::UnknownFileKind(".ts".to_string()).to_string(), "unknown file kind: \".ts\"");
        let invalid = ErrorKind::InvalidPattern {
            kind: ".js".to_string(),
            pattern: "(".to_string(),
        };
        assert_eq!(invalid.to_string(), "invalid pattern for kind \".js\": (");
        assert!(!invalid.is_retryable());
    }
}
