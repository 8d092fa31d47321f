//! Local filesystem storage backend.
//!
//! Files are read from a configured directory using `tokio::fs` for async
//! I/O.

use crate::error::ErrorKind;
use crate::models::Opened;
use crate::{StorageBackend, error::Result, path::validate as validate_path};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;

/// Local filesystem storage backend.
///
/// All source paths are resolved against the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use livepkg_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/path/to/site")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// Relative roots are resolved against the current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist or is not a directory.
    /// Unlike a library, a source tree is never created on demand.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        // Use non-async here; it'll only happen once on startup.
        let root = std::fs::canonicalize(root).map_err(|e| ErrorKind::from_io(e, root))?;
        if !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the absolute filesystem path for a source path.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self, path: &Path) -> Result<Opened> {
        let abs_path = self.absolute_path(path)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| ErrorKind::from_io(e, path))?;
        let modified = match file.metadata().await {
            Ok(metadata) if metadata.is_dir() => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
            Ok(metadata) => metadata.modified().ok().map(OffsetDateTime::from),
            // A missing timestamp only costs a re-read.
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Unable to stat opened file");
                None
            },
        };
        Ok(Opened::new(path, modified, file))
    }
}
