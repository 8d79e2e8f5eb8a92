//! Configuration file handling
//!
//! The harness settings live in a TOML file in the platform config
//! directory. Individual runs may also be described by YAML scenario files
//! containing just a [`RunConfig`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Harness-wide settings
    #[serde(default)]
    pub harness: HarnessConfig,

    /// Default run used when the command line names no subtests
    #[serde(default)]
    pub run: RunConfig,
}

/// Harness-wide settings
#[derive(Debug, Deserialize, Clone)]
pub struct HarnessConfig {
    /// Prefix of measurement names and, uppercased, of the results line tag
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Default polling interval for `wait_until`
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// File the results line and summary are appended to, besides stdout
    #[serde(default)]
    pub results_log: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            poll_interval_ms: default_poll_interval(),
            results_log: None,
        }
    }
}

fn default_prefix() -> String {
    "metaperf".to_string()
}
fn default_poll_interval() -> u64 {
    10
}

impl HarnessConfig {
    /// Tag written before the results JSON, e.g. `METAPERF`
    pub fn tag(&self) -> String {
        self.prefix.to_uppercase()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Declarative description of one run
///
/// Immutable once handed to the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Subtest names, in execution order
    #[serde(default)]
    pub subtests: Vec<String>,

    /// How many times each subtest runs back to back
    #[serde(default = "default_repeat")]
    pub repeat: u32,

    /// Rest before each subtest invocation, in milliseconds
    #[serde(default = "default_rest", alias = "rest")]
    pub rest_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            subtests: Vec::new(),
            repeat: default_repeat(),
            rest_ms: default_rest(),
        }
    }
}

fn default_repeat() -> u32 {
    1
}
fn default_rest() -> u64 {
    100
}

impl RunConfig {
    /// Create a run of `subtests`, each repeated `repeat` times
    pub fn new<S: Into<String>>(
        subtests: impl IntoIterator<Item = S>,
        repeat: u32,
        rest_ms: u64,
    ) -> Self {
        Self {
            subtests: subtests.into_iter().map(Into::into).collect(),
            repeat,
            rest_ms,
        }
    }

    pub fn rest(&self) -> Duration {
        Duration::from_millis(self.rest_ms)
    }

    /// Number of commands this run expands into
    pub fn command_count(&self) -> usize {
        self.subtests.len() * self.repeat as usize
    }

    /// Check the run can be expanded into commands
    pub fn validate(&self) -> Result<()> {
        if self.repeat == 0 {
            return Err(Error::Config("repeat must be at least 1".to_string()));
        }
        if let Some(pos) = self.subtests.iter().position(|s| s.trim().is_empty()) {
            return Err(Error::Config(format!(
                "subtest name at position {} is empty",
                pos
            )));
        }
        Ok(())
    }

    /// Load a run scenario from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let run: RunConfig = serde_yaml::from_str(&content)?;
        run.validate()?;
        Ok(run)
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}
