//! Bundle Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Nothing that goes wrong with a single source aborts a reload cycle. Each
//! failure becomes one [`Error`], and a cycle's failures are collected into
//! [`Errors`] which is handed back to the caller next to the changes.

use derive_more::{Display, Error};
use std::fmt;

/// A bundle error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// One edge that could not be ordered.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash)]
#[display("{from} -> {to}")]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// Classifies a non-fatal failure of one reload cycle.
///
/// ### Per-source failures
/// - [`ErrorKind::NotFound`]
/// - [`ErrorKind::Read`]
/// - [`ErrorKind::UnknownFileKind`]
/// - [`ErrorKind::EntryPoint`] - wraps one of the above when the source is a
///   configured entry point; the only failure callers may want to treat as
///   fatal.
///
/// ### Ordering failures
/// - [`ErrorKind::MissingDependency`]
/// - [`ErrorKind::Cycle`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source does not exist in storage.
    #[display("source not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Opening or reading the source from storage failed.
    #[display("unable to read source: {_0}")]
    Read(#[error(not(source))] String),
    /// The source's kind has no extraction rule and policy rejects it.
    #[display("unknown file kind: {_0}")]
    UnknownFileKind(#[error(not(source))] String),
    /// A configured entry point could not be loaded.
    #[display("entry point could not be loaded: {_0}")]
    EntryPoint(#[error(not(source))] String),
    /// Declared dependencies that are not part of the snapshot.
    #[display("some sources are missing: {}", _0.join(", "))]
    MissingDependency(#[error(not(source))] Vec<String>),
    /// Sources that could not be ordered because they depend on each other.
    #[display("cycle in dependencies: {}", display_edges(_0))]
    Cycle(#[error(not(source))] Vec<Edge>),
}

fn display_edges(edges: &[Edge]) -> String {
    edges.iter().map(Edge::to_string).collect::<Vec<_>>().join(", ")
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Storage may recover by the next cycle; everything else needs the
        // sources themselves to change.
        matches!(self, Self::Read(_))
    }
}

/// Every non-fatal error of one reload cycle, in the order they occurred.
#[derive(Debug, Default)]
pub struct Errors(Vec<Error>);
impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: Error) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }

    /// Error kinds only, for inspection without the location frames.
    pub fn kinds(&self) -> impl Iterator<Item = &ErrorKind> {
        self.0.iter().map(|error| &**error)
    }

    /// Returns `true` if any entry point failed to load.
    pub fn has_entry_point_failure(&self) -> bool {
        self.kinds().any(|kind| matches!(kind, ErrorKind::EntryPoint(_)))
    }

    /// `Ok(())` when nothing went wrong.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        match self.is_empty() {
            true => Ok(()),
            false => Err(self),
        }
    }
}
impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", **error)?;
        }
        Ok(())
    }
}
impl std::error::Error for Errors {}
impl Extend<Error> for Errors {
    fn extend<T: IntoIterator<Item = Error>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}
impl IntoIterator for Errors {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
