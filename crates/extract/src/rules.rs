//! Per-kind dependency extraction rules.

use std::collections::HashMap;

use exn::ResultExt;
use regex::Regex;
use tracing::instrument;

use crate::consts;
use crate::error::{ErrorKind, Result};
use crate::resolve::{kind_of, resolve};

/// What to do with a source whose kind has no rule at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UnknownKind {
    /// Refuse to track the source.
    #[default]
    Reject,
    /// Track the source as a dependency-free leaf.
    Leaf,
}

/// How sources of one kind declare their dependencies.
#[derive(Clone, Debug)]
pub enum Rule {
    /// Every match of the pattern declares one dependency, taken from its
    /// single capture group.
    Scan(Regex),
    /// Content is tracked, but never declares dependencies (images, fonts).
    Leaf,
}

/// Scans source content for declared dependencies, per kind.
///
/// Import scanning is deliberately best-effort: only the configured
/// declaration syntaxes are recognized, and comments or strings that happen
/// to contain them are matched too.
///
/// # Examples
///
/// ```
/// use livepkg_extract::Extractor;
/// let extractor = Extractor::default();
/// let deps = extractor.dependencies("/ui/main.js", br#"depends("lib/a.js"); depends('/b.js');"#).unwrap();
/// assert_eq!(deps, vec!["/ui/lib/a.js", "/b.js"]);
/// ```
#[derive(Clone, Debug)]
pub struct Extractor {
    rules: HashMap<String, Rule>,
}
impl Extractor {
    /// An extractor that knows no kinds at all.
    pub fn empty() -> Self {
        Self { rules: HashMap::new() }
    }

    /// Register (or replace) a scanning rule from a pattern string.
    pub fn with_pattern(self, kind: impl Into<String>, pattern: &str) -> Result<Self> {
        let kind = kind.into();
        let regex = Regex::new(pattern).or_raise(|| ErrorKind::InvalidPattern {
            kind: kind.clone(),
            pattern: pattern.to_string(),
        })?;
        self.with_regex(kind, regex)
    }

    /// Register (or replace) a scanning rule.
    ///
    /// The pattern must have exactly one capture group: the quoted path.
    pub fn with_regex(mut self, kind: impl Into<String>, regex: Regex) -> Result<Self> {
        let kind = kind.into();
        // Group zero is the whole match.
        if regex.captures_len() != 2 {
            exn::bail!(ErrorKind::InvalidPattern {
                kind,
                pattern: regex.as_str().to_string(),
            });
        }
        self.rules.insert(kind.to_ascii_lowercase(), Rule::Scan(regex));
        Ok(self)
    }

    /// Declare a kind as a dependency-free leaf.
    pub fn with_leaf(mut self, kind: impl Into<String>) -> Self {
        self.rules.insert(kind.into().to_ascii_lowercase(), Rule::Leaf);
        self
    }

    /// The rule for a kind, matched case-insensitively.
    pub fn rule(&self, kind: &str) -> Option<&Rule> {
        self.rules.get(&kind.to_ascii_lowercase())
    }

    /// Returns `true` if the kind has a rule, leaf or otherwise.
    pub fn handles(&self, kind: &str) -> bool {
        self.rule(kind).is_some()
    }

    /// Declared references exactly as written, in declaration order and
    /// with duplicates preserved.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD before scanning. Returns
    /// [`UnknownFileKind`](ErrorKind::UnknownFileKind) for kinds without a
    /// rule; it is up to the caller whether that is fatal.
    #[instrument(level = "trace", skip(self, content), fields(content_size = content.len()))]
    pub fn references(&self, kind: &str, content: &[u8]) -> Result<Vec<String>> {
        let Some(rule) = self.rule(kind) else {
            exn::bail!(ErrorKind::UnknownFileKind(kind.to_string()));
        };
        let regex = match rule {
            Rule::Scan(regex) => regex,
            Rule::Leaf => return Ok(Vec::new()),
        };
        let text = String::from_utf8_lossy(content);
        Ok(regex
            .captures_iter(&text)
            .filter_map(|captures| captures.get(1))
            .map(|reference| reference.as_str().to_string())
            .collect())
    }

    /// Declared dependencies of the source at `path`, resolved into
    /// canonical absolute paths.
    pub fn dependencies(&self, path: &str, content: &[u8]) -> Result<Vec<String>> {
        let references = self.references(kind_of(path), content)?;
        Ok(references.iter().map(|reference| resolve(path, reference)).collect())
    }
}
impl Default for Extractor {
    /// Script and style rules, plus the common image and font kinds as
    /// leaves.
    fn default() -> Self {
        let mut rules = HashMap::new();
        rules.insert(consts::SCRIPT.to_string(), Rule::Scan(consts::SCRIPT_REGEX.clone()));
        rules.insert(consts::STYLE.to_string(), Rule::Scan(consts::STYLE_REGEX.clone()));
        for leaf in consts::LEAF_KINDS {
            rules.insert(leaf.to_string(), Rule::Leaf);
        }
        Self { rules }
    }
}
