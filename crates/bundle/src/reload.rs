//! The incremental reload cycle.
//!
//! One cycle walks from the entry points and everything in the current
//! snapshot, re-checks each source against storage, follows declared
//! dependencies to discover new sources, and publishes a new dependency
//! ordered snapshot if anything changed.

use crate::change::Change;
use crate::error::{Error, ErrorKind, Errors, Result};
use crate::load::{Loaded, Loader};
use crate::snapshot::{Publisher, Snapshot};
use crate::sort::sort;
use crate::source::Source;
use livepkg_extract::canonicalize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// Outcome of one reload cycle.
#[derive(Debug, Default)]
pub struct Reloaded {
    /// Sources that were added, removed or modified, in the order they were
    /// visited.
    pub changes: Vec<Arc<Change>>,
    /// Every non-fatal failure of the cycle.
    pub errors: Errors,
    /// The snapshot published by this cycle; `None` if nothing changed and
    /// the previous snapshot is still current.
    pub snapshot: Option<Arc<Snapshot>>,
}

impl Reloaded {
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Where one path stands during a cycle.
struct Track {
    prev: Option<Arc<Source>>,
    next: Option<Arc<Source>>,
    /// Content changed (or the source appeared or disappeared).
    changed: bool,
    deps: bool,
}

impl Track {
    fn change(&self) -> Option<Change> {
        if !self.changed && !self.deps {
            return None;
        }
        if self.prev.is_none() && self.next.is_none() {
            return None;
        }
        Some(Change {
            prev: self.prev.clone(),
            next: self.next.clone(),
            deps: self.deps,
        })
    }
}

/// Tracked sources reachable from a set of entry points.
///
/// Reload cycles are serialized; any number of readers may take the current
/// [`Snapshot`] while a cycle is running and always get the last published
/// one.
pub struct Bundle {
    loader: Loader,
    entries: Vec<String>,
    publisher: Publisher,
    cycle: Mutex<()>,
}

impl Bundle {
    pub fn new(loader: Loader, entries: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .map(|entry| canonicalize(entry.as_ref()))
            .filter(|entry| seen.insert(entry.clone()))
            .collect();
        Self {
            loader,
            entries,
            publisher: Publisher::new(),
            cycle: Mutex::new(()),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// The last published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.publisher.read()
    }

    /// A source from the current snapshot or, if it is not tracked, straight
    /// from storage. `None` if it does not exist.
    pub async fn fetch(&self, path: &str) -> Result<Option<Arc<Source>>> {
        let path = canonicalize(path);
        if let Some(source) = self.snapshot().by_path(&path) {
            return Ok(Some(Arc::clone(source)));
        }
        self.loader.load(&path).await
    }

    /// Run one reload cycle, waiting for any cycle in progress to finish
    /// first.
    #[instrument(skip(self), fields(backend = self.loader.backend().name()))]
    pub async fn reload(&self) -> Reloaded {
        let _cycle = self.cycle.lock().await;
        let previous = self.publisher.read();

        let mut errors = Errors::new();
        let mut tracks: Vec<Track> = Vec::with_capacity(previous.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(previous.len());
        for source in previous.iter() {
            index.insert(source.path.clone(), tracks.len());
            tracks.push(Track {
                prev: Some(Arc::clone(source)),
                next: None,
                changed: false,
                deps: false,
            });
        }

        let entries: HashSet<&str> = self.entries.iter().map(String::as_str).collect();
        let mut unchecked: Vec<String> = self.entries.clone();
        unchecked.extend(previous.iter().map(|source| source.path.clone()));
        let mut checked: HashSet<String> = HashSet::new();

        while let Some(path) = unchecked.pop() {
            if !checked.insert(path.clone()) {
                continue;
            }
            let is_entry = entries.contains(path.as_str());
            let next = match index.get(&path).copied() {
                None => match self.loader.load(&path).await {
                    Ok(Some(source)) => {
                        index.insert(path.clone(), tracks.len());
                        tracks.push(Track {
                            prev: None,
                            next: Some(Arc::clone(&source)),
                            changed: true,
                            deps: !source.deps.is_empty(),
                        });
                        source
                    },
                    Ok(None) => {
                        if is_entry {
                            let missing = Error::from(ErrorKind::NotFound(path.clone()));
                            errors.push(missing.raise(ErrorKind::EntryPoint(path.clone())));
                        }
                        continue;
                    },
                    Err(e) => {
                        errors.push(match is_entry {
                            true => e.raise(ErrorKind::EntryPoint(path.clone())),
                            false => e,
                        });
                        continue;
                    },
                },
                Some(position) => {
                    let track = &mut tracks[position];
                    let Some(prev) = track.prev.clone() else {
                        continue;
                    };
                    match self.loader.reload(&prev).await {
                        Ok(Loaded::Changed(source)) => {
                            track.deps = prev.deps != source.deps;
                            track.changed = true;
                            track.next = Some(Arc::clone(&source));
                            source
                        },
                        Ok(Loaded::Unchanged(source)) => {
                            track.next = Some(Arc::clone(&source));
                            source
                        },
                        Ok(Loaded::Removed) => {
                            track.deps = !prev.deps.is_empty();
                            track.changed = true;
                            if is_entry {
                                let missing = Error::from(ErrorKind::NotFound(path.clone()));
                                errors.push(missing.raise(ErrorKind::EntryPoint(path.clone())));
                            }
                            continue;
                        },
                        Err(e) => {
                            // Keep serving what was last seen rather than
                            // reporting a removal.
                            track.next = Some(Arc::clone(&prev));
                            errors.push(match is_entry {
                                true => e.raise(ErrorKind::EntryPoint(path.clone())),
                                false => e,
                            });
                            prev
                        },
                    }
                },
            };
            for dep in next.deps.iter().rev() {
                if !checked.contains(dep) {
                    unchecked.push(dep.clone());
                }
            }
        }

        let mut sources = Vec::with_capacity(tracks.len());
        let mut changes = Vec::new();
        for track in &tracks {
            if let Some(next) = &track.next {
                sources.push(Arc::clone(next));
            }
            if let Some(change) = track.change() {
                changes.push(Arc::new(change));
            }
        }
        if !errors.is_empty() {
            tracing::warn!(errors = errors.len(), "Reload cycle had errors");
        }
        if changes.is_empty() {
            tracing::trace!("Nothing changed");
            return Reloaded {
                changes: Vec::new(),
                errors,
                snapshot: None,
            };
        }

        let sorted = sort(&sources);
        errors.extend(sorted.errors());
        let snapshot = self.publisher.publish(sorted.order);
        tracing::info!(
            generation = snapshot.generation(),
            files = snapshot.len(),
            changes = changes.len(),
            errors = errors.len(),
            "Reloaded"
        );
        Reloaded {
            changes,
            errors,
            snapshot: Some(snapshot),
        }
    }
}
