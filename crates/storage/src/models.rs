//! Storage models.
//!
//! An [`Opened`] file is what every backend hands back from
//! [`open()`](crate::StorageBackend::open): a byte stream that has not been
//! read yet, plus whatever modification time the backend could report.

use crate::error::{ErrorKind, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use time::OffsetDateTime;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Boxed, `'static` async byte stream.
pub type BoxAsyncRead = Pin<Box<dyn AsyncRead + Send + 'static>>;

/// A file opened by a storage backend.
///
/// Opening is cheap; nothing is read until [`read_to_end()`](Self::read_to_end)
/// is called, so callers can compare [`modified`](Self::modified) against a
/// previously recorded timestamp and skip the read entirely.
pub struct Opened {
    path: PathBuf,
    modified: Option<OffsetDateTime>,
    reader: BoxAsyncRead,
}
impl Opened {
    pub fn new(path: impl Into<PathBuf>, modified: Option<OffsetDateTime>, reader: impl AsyncRead + Send + 'static) -> Self {
        Self {
            path: path.into(),
            modified,
            reader: Box::pin(reader),
        }
    }

    /// Path relative to the storage root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last modification time, if the backend reports one.
    pub fn modified(&self) -> Option<OffsetDateTime> {
        self.modified
    }

    /// Whether the stored file is strictly newer than `previous`.
    ///
    /// Unknown timestamps on either side count as newer: without a clock to
    /// compare, the content has to be read.
    pub fn is_newer_than(&self, previous: Option<OffsetDateTime>) -> bool {
        match (self.modified, previous) {
            (Some(current), Some(previous)) => current > previous,
            _ => true,
        }
    }

    /// Swap the underlying stream, keeping path and timestamp.
    pub fn map_reader<R, F>(self, f: F) -> Self
    where
        R: AsyncRead + Send + 'static,
        F: FnOnce(BoxAsyncRead) -> R,
    {
        Self {
            path: self.path,
            modified: self.modified,
            reader: Box::pin(f(self.reader)),
        }
    }

    pub fn into_reader(self) -> BoxAsyncRead {
        self.reader
    }

    /// Drain the stream into memory.
    pub async fn read_to_end(mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.reader.read_to_end(&mut buffer).await.map_err(|e| ErrorKind::from_io(e, &self.path))?;
        Ok(buffer)
    }
}
impl fmt::Debug for Opened {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opened")
            .field("path", &self.path)
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;
    use time::Duration;

    fn opened(modified: Option<OffsetDateTime>) -> Opened {
        Opened::new("a.js", modified, Cursor::new(b"depends(\"b.js\")".to_vec()))
    }

    #[rstest]
    #[case(Some(0), Some(0), false)]
    #[case(Some(1), Some(0), true)]
    #[case(Some(0), Some(1), false)]
    #[case(None, Some(0), true)]
    #[case(Some(0), None, true)]
    #[case(None, None, true)]
    fn test_is_newer_than(#[case] current: Option<i64>, #[case] previous: Option<i64>, #[case] expected: bool) {
        let base = OffsetDateTime::UNIX_EPOCH;
        let current = current.map(|s| base + Duration::seconds(s));
        let previous = previous.map(|s| base + Duration::seconds(s));
        assert_eq!(opened(current).is_newer_than(previous), expected);
    }

    #[tokio::test]
    async fn test_read_to_end() {
        let data = opened(None).read_to_end().await.unwrap();
        assert_eq!(data, b"depends(\"b.js\")");
    }
}
