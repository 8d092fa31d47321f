//! Storage capability for livepkg.
//!
//! The reload engine consumes exactly one operation from this crate:
//! [`StorageBackend::open`], which yields an unread byte stream and an
//! optional modification time, or [`NotFound`](error::ErrorKind::NotFound).

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::{BoxAsyncRead, Opened};
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
