//! Mapping of source paths onto storage-relative paths.
//!
//! Sources are identified by slash-separated absolute paths (`/ui/main.js`),
//! while backends address files relative to their own root. Converting one
//! into the other must never escape that root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a source path and converts it into a path relative to the
/// storage root.
///
/// Leading separators, `.` segments and repeated slashes are dropped; `..`
/// segments are resolved but may never climb above the root. Null bytes are
/// rejected because they truncate paths in C-based syscalls.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use livepkg_storage::validate_path;
/// assert_eq!(validate_path("/ui/main.js").unwrap(), Path::new("ui/main.js"));
/// assert_eq!(validate_path("ui/lib/../main.js").unwrap(), Path::new("ui/main.js"));
/// assert!(validate_path("/../etc/passwd").is_err());
/// assert!(validate_path("/").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(s) => {
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}
