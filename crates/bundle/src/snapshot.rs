//! Published, immutable views of the tracked sources.
//!
//! A [`Publisher`] holds exactly one [`Snapshot`] at a time. Readers take an
//! `Arc` to the current snapshot without blocking; a reload cycle builds the
//! next snapshot on the side and swaps it in whole. A reader holding an old
//! snapshot keeps seeing it unchanged until it drops the `Arc`.

use crate::include::Include;
use crate::source::Source;
use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::Arc;

/// Sources in dependency order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Snapshot {
    /// Incremented on every publish; `0` is the empty initial snapshot.
    #[serde(skip)]
    generation: u64,
    #[serde(rename = "files")]
    sources: Vec<Arc<Source>>,
}

impl Snapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Every source, dependencies first.
    pub fn files(&self) -> &[Arc<Source>] {
        &self.sources
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Source>> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn by_path(&self, path: &str) -> Option<&Arc<Source>> {
        self.sources.iter().find(|source| source.path == path)
    }

    /// Sources of one kind, in snapshot order.
    pub fn by_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Arc<Source>> + 'a {
        self.sources.iter().filter(move |source| source.is_kind(kind))
    }

    /// Processed content of every source of one kind, concatenated in
    /// snapshot order. Each source is preceded by a comment naming it.
    pub fn merged(&self, kind: &str) -> Vec<u8> {
        let mut merged = Vec::new();
        for source in self.by_kind(kind) {
            merged.extend_from_slice(format!("\n/* \"{}\" */\n", source.path).as_bytes());
            merged.extend_from_slice(&source.processed);
            merged.push(b'\n');
        }
        merged
    }

    /// One include per source, in snapshot order.
    pub fn includes(&self) -> Vec<Include> {
        self.sources.iter().map(|source| Include::from(source.as_ref())).collect()
    }

    /// Query shape for API consumers, optionally naming where the live
    /// change stream can be reached.
    pub fn info(&self, live: Option<&str>) -> Info {
        Info {
            files: self.sources.clone(),
            live: live.map(str::to_string),
        }
    }
}

/// `{ "files": [...], "live": "..." }`
#[derive(Clone, Debug, Serialize)]
pub struct Info {
    pub files: Vec<Arc<Source>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live: Option<String>,
}

/// Single-writer, many-reader cell holding the current snapshot.
#[derive(Debug)]
pub struct Publisher {
    current: ArcSwap<Snapshot>,
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher {
    /// Starts out holding an empty snapshot.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    /// The current snapshot. Never blocks on a concurrent publish.
    pub fn read(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replace the current snapshot.
    ///
    /// Callers must not publish concurrently; the generation is derived from
    /// the snapshot being replaced.
    pub fn publish(&self, sources: Vec<Arc<Source>>) -> Arc<Snapshot> {
        let generation = self.current.load().generation + 1;
        let snapshot = Arc::new(Snapshot { generation, sources });
        self.current.store(Arc::clone(&snapshot));
        tracing::debug!(generation, files = snapshot.len(), "Published snapshot");
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::source;

    fn snapshot() -> Snapshot {
        Snapshot {
            generation: 1,
            sources: vec![
                Arc::new(source("/last.js", &[])),
                Arc::new(source("/theme.css", &[])),
                Arc::new(source("/main.js", &["/last.js"])),
            ],
        }
    }

    #[test]
    fn test_queries() {
        let snapshot = snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.by_path("/main.js").unwrap().deps, vec!["/last.js"]);
        assert!(snapshot.by_path("/nope.js").is_none());
        let scripts: Vec<&str> = snapshot.by_kind(".js").map(|source| source.path.as_str()).collect();
        assert_eq!(scripts, vec!["/last.js", "/main.js"]);
        assert_eq!(snapshot.by_kind(".CSS").count(), 1);
    }

    #[test]
    fn test_merged() {
        let merged = snapshot().merged(".js");
        assert_eq!(
            String::from_utf8(merged).unwrap(),
            "\n/* \"/last.js\" */\ncontent\n\n/* \"/main.js\" */\ncontent\n"
        );
        assert!(snapshot().merged(".png").is_empty());
    }

    #[test]
    fn test_info_wire_format() {
        let snapshot = snapshot();
        let json = serde_json::to_value(snapshot.info(None)).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
        assert_eq!(json["files"].as_array().unwrap().len(), 3);
        assert_eq!(json["files"][2]["path"], "/main.js");

        let json = serde_json::to_value(snapshot.info(Some("/~live"))).unwrap();
        assert_eq!(json["live"], "/~live");
        assert_eq!(serde_json::to_value(&snapshot).unwrap()["files"], json["files"]);
    }

    #[test]
    fn test_publish_keeps_old_readers() {
        let publisher = Publisher::new();
        let empty = publisher.read();
        assert!(empty.is_empty());
        assert_eq!(empty.generation(), 0);

        let first = publisher.publish(vec![Arc::new(source("/a.js", &[]))]);
        assert_eq!(first.generation(), 1);
        assert!(empty.is_empty());
        assert!(Arc::ptr_eq(&publisher.read(), &first));

        publisher.publish(Vec::new());
        assert_eq!(publisher.read().generation(), 2);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_concurrent_readers_never_see_partial_snapshots() {
        let publisher = Arc::new(Publisher::new());
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let publisher = Arc::clone(&publisher);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let snapshot = publisher.read();
                        // Every published generation n holds n sources.
                        assert_eq!(snapshot.len() as u64, snapshot.generation());
                    }
                })
            })
            .collect();
        for generation in 1..=50u64 {
            let sources = (0..generation).map(|i| Arc::new(source(&format!("/{i}.js"), &[]))).collect();
            publisher.publish(sources);
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
