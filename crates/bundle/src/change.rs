use crate::source::Source;
use serde::Serialize;
use std::sync::Arc;

/// What happened to one source between two reload cycles.
///
/// Serializes to the wire shape `{ "prev": Source|null, "next": Source|null, "deps": bool }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Change {
    /// `None` if the source was added.
    pub prev: Option<Arc<Source>>,
    /// `None` if the source was deleted.
    pub next: Option<Arc<Source>>,
    /// `true` if the declared dependencies changed. Subscribers should not
    /// hot-swap just this file, but reload everything that depends on it.
    pub deps: bool,
}

impl Change {
    pub fn added(next: Arc<Source>) -> Self {
        let deps = !next.deps.is_empty();
        Self { prev: None, next: Some(next), deps }
    }

    pub fn removed(prev: Arc<Source>) -> Self {
        let deps = !prev.deps.is_empty();
        Self { prev: Some(prev), next: None, deps }
    }

    pub fn modified(prev: Arc<Source>, next: Arc<Source>) -> Self {
        let deps = prev.deps != next.deps;
        Self {
            prev: Some(prev),
            next: Some(next),
            deps,
        }
    }

    /// Path of the source this change is about.
    pub fn path(&self) -> &str {
        self.next.as_ref().or(self.prev.as_ref()).map(|source| source.path.as_str()).unwrap_or_default()
    }

    pub fn is_added(&self) -> bool {
        self.prev.is_none() && self.next.is_some()
    }

    pub fn is_removed(&self) -> bool {
        self.prev.is_some() && self.next.is_none()
    }
}
