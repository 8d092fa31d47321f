//! Storage errors.
//!
//! The bundle only distinguishes two outcomes of opening a source: the file
//! is absent ([`ErrorKind::NotFound`]), or loading it failed (everything
//! else). The other kinds exist so that logs say why.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The source is not in storage. Not a failure: deleted sources are
    /// reported as removals.
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Escapes the storage root, contains a null byte, or names a directory.
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Opening or reading the file did not finish before the deadline.
    #[display("timed out: {}", _0.display())]
    TimedOut(#[error(not(source))] PathBuf),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::TimedOut(_))
    }

    /// Returns `true` if the file is legitimately absent, as opposed to
    /// failing to load.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Map an I/O error for `path` onto the matching storage error.
    pub fn from_io(e: IoError, path: impl Into<PathBuf>) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            std::io::ErrorKind::TimedOut => Self::TimedOut(path.into()),
            _ => Self::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound(PathBuf::from("a/b.js")).to_string(), "file not found: a/b.js");
        assert_eq!(ErrorKind::TimedOut(PathBuf::from("slow.css")).to_string(), "timed out: slow.css");
    }

    #[rstest]
    #[case(std::io::ErrorKind::NotFound, true, false)]
    #[case(std::io::ErrorKind::PermissionDenied, false, false)]
    #[case(std::io::ErrorKind::TimedOut, false, true)]
    #[case(std::io::ErrorKind::Other, false, true)]
    fn error_from_io(#[case] kind: std::io::ErrorKind, #[case] not_found: bool, #[case] retryable: bool) {
        let err = ErrorKind::from_io(IoError::new(kind, "boom"), "file.js");
        assert_eq!(err.is_not_found(), not_found);
        assert_eq!(err.is_retryable(), retryable);
    }
}
