//! Layered configuration for livepkg.
//!
//! Values are merged in order of increasing priority:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. a configuration file (TOML, YAML or JSON, chosen by extension),
//! 3. environment variables prefixed with `LIVEPKG_` (`LIVEPKG_INTERVAL_MS=250`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use livepkg_extract::{Extractor, LEAF_KINDS, SCRIPT, SCRIPT_PATTERN, STYLE, STYLE_PATTERN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use livepkg_extract::UnknownKind;

pub const ENV_PREFIX: &str = "LIVEPKG_";
pub const CONFIG_FILE_NAME: &str = "livepkg.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory that source paths are resolved against.
    pub root: PathBuf,
    /// Entry points that reachability is computed from.
    pub entries: Vec<String>,
    /// Milliseconds between periodic reloads.
    pub interval_ms: u64,
    /// Kind (extension including the dot) to declaration pattern. Each
    /// pattern needs exactly one capture group.
    pub rules: BTreeMap<String, String>,
    /// Kinds tracked as dependency-free leaves.
    pub leaf: Vec<String>,
    /// Policy for kinds that are neither in `rules` nor in `leaf`.
    pub unknown: UnknownKind,
    /// Capacity of each subscriber's pending change queue.
    pub queue: usize,
    /// Upper bound on opening and reading a single file.
    pub read_timeout_ms: Option<u64>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            entries: Vec::new(),
            interval_ms: 500,
            rules: BTreeMap::from([
                (SCRIPT.to_string(), SCRIPT_PATTERN.to_string()),
                (STYLE.to_string(), STYLE_PATTERN.to_string()),
            ]),
            leaf: LEAF_KINDS.iter().map(|kind| kind.to_string()).collect(),
            unknown: UnknownKind::default(),
            queue: 64,
            read_timeout_ms: None,
        }
    }
}

impl Config {
    /// Platform-specific location of the user's configuration file.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "livepkg").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Build the layered provider without extracting it.
    ///
    /// A missing file is skipped silently (figment treats absent files as
    /// empty), but an unsupported extension is an error.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            let extension = file.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load and validate the configuration.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Config = Self::figment(file)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(root = %config.root.display(), entries = ?config.entries, "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            exn::bail!(ErrorKind::Invalid("at least one entry point is required".to_string()));
        }
        if let Some(entry) = self.entries.iter().find(|entry| entry.trim().is_empty()) {
            exn::bail!(ErrorKind::Invalid(format!("entry point {entry:?} is empty")));
        }
        if self.interval_ms == 0 {
            exn::bail!(ErrorKind::Invalid("interval_ms must be greater than zero".to_string()));
        }
        if self.queue == 0 {
            exn::bail!(ErrorKind::Invalid("queue must be greater than zero".to_string()));
        }
        if self.read_timeout_ms == Some(0) {
            exn::bail!(ErrorKind::Invalid("read_timeout_ms must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Build the extractor described by `rules` and `leaf`.
    pub fn extractor(&self) -> Result<Extractor> {
        let mut extractor = Extractor::empty();
        for kind in &self.leaf {
            extractor = extractor.with_leaf(kind.as_str());
        }
        for (kind, pattern) in &self.rules {
            extractor = extractor.with_pattern(kind.as_str(), pattern).or_raise(|| ErrorKind::Rule(kind.clone()))?;
        }
        Ok(extractor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn valid() -> Config {
        Config {
            entries: vec!["/ui/main.js".to_string()],
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.interval(), Duration::from_millis(500));
        assert_eq!(config.unknown, UnknownKind::Reject);
        assert!(config.read_timeout().is_none());
        // Defaults alone have no entry points.
        assert!(config.validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_default_extractor() {
        let extractor = valid().extractor().unwrap();
        let deps = extractor.dependencies("/ui/main.js", br#"depends("a.js")"#).unwrap();
        assert_eq!(deps, vec!["/ui/a.js"]);
        assert!(extractor.handles(".png"));
        assert!(!extractor.handles(".ts"));
    }

    #[test]
    fn test_invalid_rule() {
        let mut config = valid();
        config.rules.insert(".ts".to_string(), "(".to_string());
        let err = config.extractor().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Rule(kind) if kind == ".ts"));
    }

    #[rstest]
    #[case(Config { entries: vec![], ..valid() })]
    #[case(Config { entries: vec![" ".to_string()], ..valid() })]
    #[case(Config { interval_ms: 0, ..valid() })]
    #[case(Config { queue: 0, ..valid() })]
    #[case(Config { read_timeout_ms: Some(0), ..valid() })]
    fn test_validate_rejects(#[case] config: Config) {
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_load_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "livepkg.toml",
                r#"
                    root = "site"
                    entries = ["/ui/main.js", "/ui/main.css"]
                    unknown = "leaf"

                    [rules]
                    ".ts" = 'import\s+"([^"]+)"'
                "#,
            )?;
            jail.set_env("LIVEPKG_INTERVAL_MS", "250");
            let config = Config::load(Some(Path::new("livepkg.toml"))).unwrap();
            assert_eq!(config.root, PathBuf::from("site"));
            assert_eq!(config.entries, vec!["/ui/main.js", "/ui/main.css"]);
            assert_eq!(config.unknown, UnknownKind::Leaf);
            assert_eq!(config.interval_ms, 250);
            // File rules are merged on top of the defaults.
            assert!(config.rules.contains_key(".js"));
            assert!(config.extractor().unwrap().handles(".ts"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("LIVEPKG_ENTRIES", "[\"/main.js\"]");
            let config = Config::load(Some(Path::new("absent.toml"))).unwrap();
            assert_eq!(config.entries, vec!["/main.js"]);
            assert_eq!(config.queue, 64);
            Ok(())
        });
    }

    #[test]
    fn test_unsupported_format() {
        let err = Config::figment(Some(Path::new("livepkg.ini"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }
}
