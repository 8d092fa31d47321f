//! Dependency ordering of source records.
//!
//! Kahn's algorithm over the edges whose target is part of the input set.
//! Edges that point outside the set are reported as missing and never block
//! placement. Records left over once no more can be placed sit on or behind
//! a cycle; they are appended in input order so nothing is ever dropped.

use crate::error::{Edge, Error, ErrorKind};
use crate::source::Source;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Result of ordering a set of sources.
#[derive(Debug, Default)]
pub struct Sorted {
    /// Every input record exactly once. In the acyclic case each record's
    /// present dependencies come before it.
    pub order: Vec<Arc<Source>>,
    /// Declared dependencies not in the input set, once each, in the order
    /// they were first seen.
    pub missing: Vec<String>,
    /// Edges between records that could not be placed.
    pub unresolved: Vec<Edge>,
}

impl Sorted {
    /// Returns `true` if every record was placed after its dependencies.
    pub fn is_ordered(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Diagnostics for the caller's aggregated error list.
    pub fn errors(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        if !self.missing.is_empty() {
            errors.push(Error::from(ErrorKind::MissingDependency(self.missing.clone())));
        }
        if !self.unresolved.is_empty() {
            errors.push(Error::from(ErrorKind::Cycle(self.unresolved.clone())));
        }
        errors
    }
}

/// Order `sources` so that dependencies come first.
///
/// Paths are expected to be unique. Independent records keep their relative
/// input order.
#[tracing::instrument(level = "debug", skip_all, fields(sources = sources.len()))]
pub fn sort(sources: &[Arc<Source>]) -> Sorted {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(sources.len());
    for (position, source) in sources.iter().enumerate() {
        index.entry(source.path.as_str()).or_insert(position);
    }

    let mut missing = Vec::new();
    let mut seen_missing = HashSet::new();
    let mut pending = vec![0usize; sources.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); sources.len()];
    for (position, source) in sources.iter().enumerate() {
        let mut counted = HashSet::new();
        for dep in &source.deps {
            match index.get(dep.as_str()) {
                Some(&target) => {
                    if counted.insert(target) {
                        pending[position] += 1;
                        dependents[target].push(position);
                    }
                },
                None => {
                    if seen_missing.insert(dep.as_str()) {
                        missing.push(dep.clone());
                    }
                },
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..sources.len()).filter(|&position| pending[position] == 0).collect();
    let mut placed = vec![false; sources.len()];
    let mut order = Vec::with_capacity(sources.len());
    while let Some(position) = ready.pop_front() {
        placed[position] = true;
        order.push(Arc::clone(&sources[position]));
        for &dependent in &dependents[position] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.push_back(dependent);
            }
        }
    }

    let mut unresolved = Vec::new();
    if order.len() < sources.len() {
        for (position, source) in sources.iter().enumerate() {
            if placed[position] {
                continue;
            }
            let mut reported = HashSet::new();
            for dep in &source.deps {
                if let Some(&target) = index.get(dep.as_str())
                    && !placed[target]
                    && reported.insert(target)
                {
                    unresolved.push(Edge {
                        from: source.path.clone(),
                        to: dep.clone(),
                    });
                }
            }
            order.push(Arc::clone(source));
        }
        tracing::warn!(residual = sources.len() - placed.iter().filter(|&&placed| placed).count(), "Dependency cycle");
    }

    Sorted {
        order,
        missing,
        unresolved,
    }
}
