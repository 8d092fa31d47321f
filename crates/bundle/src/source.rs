//! Source records.

use livepkg_extract::{FALLBACK_CONTENT_TYPE, content_type, kind_of};
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;

/// One tracked file.
///
/// Records are immutable once created: a file that changes on storage gets a
/// new record, so a snapshot that is being read never changes underneath
/// its reader. Content is reference-counted so that carrying a record
/// forward between cycles never copies bytes.
///
/// Serializes to the wire shape `{ path, deps, ext, modified, contentType }`;
/// content never leaves the process this way.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Source {
    /// Canonical absolute path, unique within a snapshot.
    pub path: String,
    /// Canonical absolute paths of declared dependencies, in declaration
    /// order. May name files that are not tracked.
    pub deps: Vec<String>,
    /// Extension including the leading dot.
    pub ext: String,
    /// Last observed modification time.
    #[serde(with = "time::serde::rfc3339")]
    pub modified: OffsetDateTime,
    #[serde(rename = "contentType")]
    pub content_type: String,
    /// Raw bytes as last read from storage.
    #[serde(skip)]
    pub content: Arc<[u8]>,
    /// Content after the bundle's [`Transform`].
    #[serde(skip)]
    pub processed: Arc<[u8]>,
}

impl Source {
    /// Build a record, deriving kind and content type from the path.
    pub fn new(
        path: impl Into<String>,
        modified: OffsetDateTime,
        content: Arc<[u8]>,
        processed: Arc<[u8]>,
        deps: Vec<String>,
    ) -> Self {
        let path = path.into();
        let ext = kind_of(&path).to_string();
        let content_type = content_type(&ext).unwrap_or(FALLBACK_CONTENT_TYPE).to_string();
        Self {
            path,
            deps,
            ext,
            modified,
            content_type,
            content,
            processed,
        }
    }

    /// Same content, dependencies and identity on the wire, observed at a
    /// later time.
    pub fn restamped(&self, modified: OffsetDateTime) -> Self {
        Self {
            modified,
            ..self.clone()
        }
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.ext.eq_ignore_ascii_case(kind)
    }
}

/// Pass-through step that turns a source's raw content into what is served.
///
/// Runs once per fresh read; records carried forward keep their processed
/// bytes.
pub trait Transform: Send + Sync {
    fn process(&self, path: &str, content: &Arc<[u8]>) -> Arc<[u8]>;
}

/// Serves content unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;
impl Transform for Identity {
    fn process(&self, _path: &str, content: &Arc<[u8]>) -> Arc<[u8]> {
        Arc::clone(content)
    }
}
