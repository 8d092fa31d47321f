//! Loading a single source from storage.

use crate::error::{ErrorKind, Result};
use crate::source::{Identity, Source, Transform};
use exn::ResultExt;
use livepkg_extract::error::ErrorKind as ExtractErrorKind;
use livepkg_extract::{Extractor, UnknownKind, kind_of};
use livepkg_storage::BackendHandle;
use livepkg_storage::error::ErrorKind as StorageErrorKind;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::instrument;

/// Outcome of re-checking one source against storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Loaded {
    /// Content differs from the previous record, or there was none.
    Changed(Arc<Source>),
    /// Content is byte-identical to the previous record. The record may be
    /// the previous one, or a copy of it carrying a newer timestamp.
    Unchanged(Arc<Source>),
    /// Storage no longer has the file.
    Removed,
}

impl Loaded {
    /// The resulting record, if the file still exists.
    pub fn source(&self) -> Option<&Arc<Source>> {
        match self {
            Self::Changed(source) | Self::Unchanged(source) => Some(source),
            Self::Removed => None,
        }
    }
}

/// Reads sources from storage and turns them into records.
///
/// `NotFound` from storage is never an error here: it becomes
/// [`Loaded::Removed`] (or `None` from [`Loader::load`]). Every other storage
/// failure is raised as [`ErrorKind::Read`].
#[derive(Clone)]
pub struct Loader {
    backend: BackendHandle,
    extractor: Arc<Extractor>,
    unknown: UnknownKind,
    transform: Arc<dyn Transform>,
}

impl Loader {
    pub fn new(backend: BackendHandle, extractor: Extractor) -> Self {
        Self {
            backend,
            extractor: Arc::new(extractor),
            unknown: UnknownKind::default(),
            transform: Arc::new(Identity),
        }
    }

    /// Policy for kinds the extractor has no rule for.
    pub fn with_unknown(mut self, unknown: UnknownKind) -> Self {
        self.unknown = unknown;
        self
    }

    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transform = Arc::new(transform);
        self
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Load a source that has no previous record. `None` if it does not
    /// exist.
    pub async fn load(&self, path: &str) -> Result<Option<Arc<Source>>> {
        Ok(self.read(path, None).await?.source().cloned())
    }

    /// Re-check a previously loaded source.
    ///
    /// Storage is asked for the file's modification time first; if it is
    /// not strictly newer than `previous.modified`, the previous record is
    /// returned without reading any content.
    pub async fn reload(&self, previous: &Arc<Source>) -> Result<Loaded> {
        self.read(&previous.path, Some(previous)).await
    }

    #[instrument(level = "debug", skip(self, previous), fields(backend = self.backend.name()))]
    async fn read(&self, path: &str, previous: Option<&Arc<Source>>) -> Result<Loaded> {
        let kind = kind_of(path);
        if !self.extractor.handles(kind) && self.unknown == UnknownKind::Reject {
            exn::bail!(ErrorKind::UnknownFileKind(path.to_string()));
        }

        let opened = match self.backend.open(Path::new(path)).await {
            Ok(opened) => opened,
            Err(e) if matches!(e.deref(), StorageErrorKind::NotFound(_)) => return Ok(Loaded::Removed),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Read(path.to_string())),
        };
        if let Some(previous) = previous
            && !opened.is_newer_than(Some(previous.modified))
        {
            return Ok(Loaded::Unchanged(Arc::clone(previous)));
        }

        // Without a timestamp from storage the file counts as modified now.
        let modified = opened.modified().unwrap_or_else(OffsetDateTime::now_utc);
        let content: Arc<[u8]> = match opened.read_to_end().await {
            Ok(content) => content.into(),
            Err(e) if matches!(e.deref(), StorageErrorKind::NotFound(_)) => return Ok(Loaded::Removed),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Read(path.to_string())),
        };

        if let Some(previous) = previous
            && *previous.content == *content
        {
            // Same bytes extract to the same dependencies.
            tracing::trace!("Touched without a content change");
            return Ok(Loaded::Unchanged(Arc::new(previous.restamped(modified))));
        }

        let deps = match self.extractor.dependencies(path, &content) {
            Ok(deps) => deps,
            Err(e) if matches!(e.deref(), ExtractErrorKind::UnknownFileKind(_)) => Vec::new(),
            Err(e) => return Err(e).or_raise(|| ErrorKind::UnknownFileKind(path.to_string())),
        };
        let processed = self.transform.process(path, &content);
        tracing::debug!(size = content.len(), deps = deps.len(), "Loaded source");
        Ok(Loaded::Changed(Arc::new(Source::new(path, modified, content, processed, deps))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livepkg_storage::backend::MockBackend;

    fn loader(backend: &Arc<MockBackend>) -> Loader {
        Loader::new(backend.clone(), Extractor::default())
    }

    #[tokio::test]
    async fn test_load_fresh() {
        let backend = Arc::new(MockBackend::with_files([(
            "/ui/main.js",
            r#"depends("lib/a.js"); depends("../b.js");"#,
        )]));
        let source = loader(&backend).load("/ui/main.js").await.unwrap().unwrap();
        assert_eq!(source.path, "/ui/main.js");
        assert_eq!(source.deps, vec!["/ui/lib/a.js", "/b.js"]);
        assert_eq!(source.ext, ".js");
        assert_eq!(&*source.processed, &*source.content);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let backend = Arc::new(MockBackend::default());
        assert!(loader(&backend).load("/missing.js").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_error() {
        let backend = Arc::new(MockBackend::with_files([("/a.css", "")]));
        backend.set_failing("/a.css", true).await;
        let err = loader(&backend).load("/a.css").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Read(path) if path == "/a.css"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_reload_fast_path() {
        let backend = Arc::new(MockBackend::with_files([("/a.js", "one")]));
        let loader = loader(&backend);
        let first = loader.load("/a.js").await.unwrap().unwrap();
        let Loaded::Unchanged(second) = loader.reload(&first).await.unwrap() else {
            panic!("expected unchanged");
        };
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_reload_touch_is_unchanged() {
        let backend = Arc::new(MockBackend::with_files([("/a.js", "one")]));
        let loader = loader(&backend);
        let first = loader.load("/a.js").await.unwrap().unwrap();
        backend.touch("/a.js").await;
        let Loaded::Unchanged(second) = loader.reload(&first).await.unwrap() else {
            panic!("expected unchanged");
        };
        assert!(second.modified > first.modified);
        assert!(Arc::ptr_eq(&first.content, &second.content));
        // The newer timestamp makes the next check take the fast path again.
        let Loaded::Unchanged(third) = loader.reload(&second).await.unwrap() else {
            panic!("expected unchanged");
        };
        assert!(Arc::ptr_eq(&second, &third));
    }

    #[tokio::test]
    async fn test_reload_changed() {
        let backend = Arc::new(MockBackend::with_files([("/a.js", "one")]));
        let loader = loader(&backend);
        let first = loader.load("/a.js").await.unwrap().unwrap();
        backend.write("/a.js", r#"depends("b.js")"#).await;
        let Loaded::Changed(second) = loader.reload(&first).await.unwrap() else {
            panic!("expected changed");
        };
        assert_eq!(second.deps, vec!["/b.js"]);
    }

    #[tokio::test]
    async fn test_reload_removed() {
        let backend = Arc::new(MockBackend::with_files([("/a.js", "one")]));
        let loader = loader(&backend);
        let first = loader.load("/a.js").await.unwrap().unwrap();
        backend.remove("/a.js").await;
        assert_eq!(loader.reload(&first).await.unwrap(), Loaded::Removed);
    }

    #[tokio::test]
    async fn test_without_timestamps_always_reads() {
        let backend = Arc::new(MockBackend::with_files([("/a.js", "one")]).without_timestamps());
        let loader = loader(&backend);
        let first = loader.load("/a.js").await.unwrap().unwrap();
        backend.write("/a.js", "two").await;
        assert!(matches!(loader.reload(&first).await.unwrap(), Loaded::Changed(_)));
    }

    #[tokio::test]
    async fn test_unknown_kind_policy() {
        let backend = Arc::new(MockBackend::with_files([("/notes.txt", "depends(\"x.js\")")]));
        let err = loader(&backend).load("/notes.txt").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownFileKind(path) if path == "/notes.txt"));

        let leaf = loader(&backend).with_unknown(UnknownKind::Leaf);
        let source = leaf.load("/notes.txt").await.unwrap().unwrap();
        assert!(source.deps.is_empty());
        assert_eq!(source.content_type, "text/plain; charset=utf-8");
    }

    #[tokio::test]
    async fn test_transform() {
        struct Upper;
        impl Transform for Upper {
            fn process(&self, _path: &str, content: &Arc<[u8]>) -> Arc<[u8]> {
                content.to_ascii_uppercase().into()
            }
        }
        let backend = Arc::new(MockBackend::with_files([("/a.css", "body{}")]));
        let source = loader(&backend).with_transform(Upper).load("/a.css").await.unwrap().unwrap();
        assert_eq!(&*source.processed, b"BODY{}");
        assert_eq!(&*source.content, b"body{}");
    }
}
