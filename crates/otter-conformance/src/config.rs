//! TOML configuration for the conformance runner

use otter_object::RealmOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "conformance.toml";

/// Features skipped unless the configuration says otherwise
pub const DEFAULT_SKIP_FEATURES: &[&str] = &[];

/// Conformance runner configuration loaded from a TOML file
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConformanceConfig {
    /// Features to skip
    pub skip_features: Vec<String>,

    /// Scenario path patterns to ignore (substring match)
    pub ignored_scenarios: Vec<String>,

    /// Scenarios expected to fail; a failure is reported but not counted
    pub known_failures: Vec<String>,

    /// Options for every realm the runner creates
    pub realm: RealmOptions,

    /// Directory for saving JSON results
    pub results_dir: Option<PathBuf>,
}

impl Default for ConformanceConfig {
    fn default() -> Self {
        Self {
            skip_features: DEFAULT_SKIP_FEATURES.iter().map(|s| s.to_string()).collect(),
            ignored_scenarios: Vec::new(),
            known_failures: Vec::new(),
            realm: RealmOptions::default(),
            results_dir: None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config '{path}': {source}")]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        /// Config path
        path: PathBuf,
        /// Underlying TOML error
        source: toml::de::Error,
    },
}

impl ConformanceConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or `conformance.toml` when it exists; fall back to
    /// defaults with a warning when loading fails.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if !default_path.exists() {
                    return Self::default();
                }
                default_path
            }
        };
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Check if a scenario path matches any ignored pattern
    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignored_scenarios
            .iter()
            .any(|pattern| path.contains(pattern.as_str()))
    }

    /// Check if a scenario is expected to fail
    pub fn is_known_failure(&self, path: &str) -> bool {
        self.known_failures
            .iter()
            .any(|pattern| path.contains(pattern.as_str()))
    }

    /// First skipped feature among `features`, if any
    pub fn skipped_feature<'a>(&self, features: &[&'a str]) -> Option<&'a str> {
        features
            .iter()
            .copied()
            .find(|feature| self.skip_features.iter().any(|skip| skip == feature))
    }
}
