//! Storage backend trait and implementations.
//!
//! The bundle only ever needs one capability from its storage: open a path,
//! giving back a byte stream and (optionally) a modification timestamp, or
//! [`NotFound`](crate::error::ErrorKind::NotFound). Everything else (listing,
//! writing) is the business of whoever edits the files.

mod deadline;
mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::deadline::DeadlineBackend;
pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::models::Opened;
use async_trait::async_trait;
use std::path::Path;

/// Unified interface for storage backends.
///
/// # Path Handling
/// Paths are source paths (`/ui/main.js`), resolved against the storage
/// root. Implementations must validate them with
/// [`validate_path`](crate::validate_path) so that no path escapes the root.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use livepkg_storage::{StorageBackend, error::Result};
///
/// async fn size_of(backend: &dyn StorageBackend) -> Result<usize> {
///     let opened = backend.open(Path::new("/ui/main.js")).await?;
///     Ok(opened.read_to_end().await?.len())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// Open a file for reading.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist; any other failure is a genuine load error. No bytes
    /// are read before returning.
    async fn open(&self, path: &Path) -> Result<Opened>;

    /// Read file contents.
    ///
    /// Default implementation opens the file and drains the stream.
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.open(path).await?.read_to_end().await
    }
}
