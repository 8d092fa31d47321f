//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::models::Opened;
use crate::path::validate as validate_path;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use crate::StorageBackend;

#[derive(Default)]
struct State {
    files: HashMap<PathBuf, (OffsetDateTime, Vec<u8>)>,
    failing: HashSet<PathBuf>,
    clock: Option<OffsetDateTime>,
}
impl State {
    /// Wall-clock time, nudged forward so that two writes in quick
    /// succession never share a timestamp.
    fn tick(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let next = match self.clock {
            Some(last) if now <= last => last + Duration::nanoseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next
    }
}

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so every method can
/// operate on `&self` while a bundle holds the backend. Every write stamps
/// the file with a strictly increasing modification time.
///
/// # Examples
///
/// ```
/// use livepkg_storage::backend::MockBackend;
/// use livepkg_storage::StorageBackend;
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("/main.js", "depends(\"alpha.js\")")]);
/// backend.write("/alpha.js", "").await;
/// assert_eq!(backend.read(Path::new("/alpha.js")).await?, b"");
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    timestamps: bool,
    state: RwLock<State>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut state = State::default();
        for (path, data) in files {
            let path = Self::validated(path.into());
            let stamp = state.tick();
            state.files.insert(path, (stamp, data.into()));
        }
        Self {
            name: "mock".to_string(),
            timestamps: true,
            state: RwLock::new(state),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Stop reporting modification times, like a backend that cannot stat.
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    fn validated(path: PathBuf) -> PathBuf {
        let Ok(validated) = validate_path(&path) else {
            // The panic here is DELIBERATE. MockBackend is intended to be
            // used in tests; panics are expected. There is no error result.
            panic!("MockBackend: invalid path {}", path.display());
        };
        validated
    }

    /// Create or overwrite a file.
    pub async fn write(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        let path = Self::validated(path.into());
        let mut state = self.state.write().await;
        let stamp = state.tick();
        state.files.insert(path, (stamp, data.into()));
    }

    /// Bump the modification time without changing the content.
    pub async fn touch(&self, path: impl Into<PathBuf>) {
        let path = Self::validated(path.into());
        let mut state = self.state.write().await;
        let stamp = state.tick();
        if let Some((modified, _)) = state.files.get_mut(&path) {
            *modified = stamp;
        }
    }

    /// Delete a file, returning whether it existed.
    pub async fn remove(&self, path: impl Into<PathBuf>) -> bool {
        let path = Self::validated(path.into());
        self.state.write().await.files.remove(&path).is_some()
    }

    /// Make every subsequent open of `path` fail with an I/O error (or stop
    /// doing so when `failing` is `false`).
    pub async fn set_failing(&self, path: impl Into<PathBuf>, failing: bool) {
        let path = Self::validated(path.into());
        let mut state = self.state.write().await;
        match failing {
            true => state.failing.insert(path),
            false => state.failing.remove(&path),
        };
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self, path: &Path) -> Result<Opened> {
        let validated = validate_path(path)?;
        let state = self.state.read().await;
        if state.failing.contains(&validated) {
            let err = std::io::Error::other(format!("injected failure for {}", validated.display()));
            exn::bail!(ErrorKind::Io(err));
        }
        let (modified, data) =
            state.files.get(&validated).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.to_path_buf())))?;
        let modified = self.timestamps.then_some(modified);
        Ok(Opened::new(validated, modified, Cursor::new(data)))
    }
}
