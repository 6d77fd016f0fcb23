//! Scoring policy configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default score below which a peer is blocked.
pub const DEFAULT_BLOCK_THRESHOLD: f64 = -100.0;

/// Default per-connection churn penalty.
pub const DEFAULT_CONNECTION_FACTOR: f64 = -10.0;

const DEFAULT_INSPECT_INTERVAL_MS: u64 = 1_000;
const DEFAULT_METRICS_QUEUE_CAPACITY: usize = 1_024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How connection churn folds into the score compared against the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChurnPolicy {
    /// Compare the engine's score as-is.
    #[default]
    Ignore,
    /// Add `connections * connection_factor` before comparing.
    Penalize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoreConfig {
    /// Scores strictly below this block the peer; strictly above unblock it.
    pub block_threshold: f64,
    /// Score delta per recorded connection. Must not be positive.
    pub connection_factor: f64,
    pub churn_policy: ChurnPolicy,
    /// Upper bound on peers tracked by the event recorder. None = unlimited.
    pub max_tracked_peers: Option<usize>,
    /// Period of the inspection loop in milliseconds.
    pub inspect_interval_ms: u64,
    /// Capacity of the queue in front of a slow metrics sink.
    pub metrics_queue_capacity: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            block_threshold: DEFAULT_BLOCK_THRESHOLD,
            connection_factor: DEFAULT_CONNECTION_FACTOR,
            churn_policy: ChurnPolicy::Ignore,
            max_tracked_peers: None,
            inspect_interval_ms: DEFAULT_INSPECT_INTERVAL_MS,
            metrics_queue_capacity: DEFAULT_METRICS_QUEUE_CAPACITY,
        }
    }
}

impl ScoreConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.block_threshold.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "block_threshold must be finite, got {}",
                self.block_threshold
            )));
        }
        if !self.connection_factor.is_finite() || self.connection_factor > 0.0 {
            return Err(ConfigError::Invalid(format!(
                "connection_factor must be a finite non-positive number, got {}",
                self.connection_factor
            )));
        }
        if self.inspect_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "inspect_interval_ms must be greater than zero".into(),
            ));
        }
        if self.metrics_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "metrics_queue_capacity must be greater than zero".into(),
            ));
        }
        if self.max_tracked_peers == Some(0) {
            return Err(ConfigError::Invalid(
                "max_tracked_peers must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }

    pub fn inspect_interval(&self) -> Duration {
        Duration::from_millis(self.inspect_interval_ms)
    }
}
