//! Engine configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `TRIGGER_ENGINE__*` environment variables
//! (e.g. `TRIGGER_ENGINE__INTERVAL_SECS=30`,
//! `TRIGGER_ENGINE__PERSISTENCE__MAX_ATTEMPTS=5`).

use crate::error::ConfigError;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use storage::RetryPolicy;
use tracing::info;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TRIGGER_ENGINE";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds between ticks (default: 60)
    pub interval_secs: u64,
    /// Budget for one metrics collection (default: 5)
    pub collection_timeout_secs: u64,
    /// Pause after a failed tick (default: 10)
    pub failure_backoff_secs: u64,
    /// Time the loop gets to finish its tick on stop before it is aborted
    pub shutdown_grace_secs: u64,
    /// Snapshots kept in memory
    pub snapshot_history: usize,
    /// Triggers kept in memory
    pub trigger_history: usize,
    /// Entries of each history written per tick
    pub persist_tail: usize,
    /// Root of the file sink
    pub data_dir: PathBuf,
    /// Indicators document written by the external collector
    pub metrics_file: PathBuf,
    /// Register the built-in heuristic advisors
    pub advisory_enabled: bool,
    /// Sink write retries
    pub persistence: RetryPolicy,
    /// Listen address of the control surface
    pub http_addr: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            collection_timeout_secs: 5,
            failure_backoff_secs: 10,
            shutdown_grace_secs: 30,
            snapshot_history: 1000,
            trigger_history: 1000,
            persist_tail: 100,
            data_dir: PathBuf::from("data"),
            metrics_file: PathBuf::from("metrics.json"),
            advisory_enabled: false,
            persistence: RetryPolicy::default(),
            http_addr: "0.0.0.0:8080".to_string(),
            log_json: false,
        }
    }
}

impl EngineConfig {
    /// Load defaults, then `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid("interval_secs must be positive".to_string()));
        }
        if self.collection_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "collection_timeout_secs must be positive".to_string(),
            ));
        }
        if self.persistence.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "persistence.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn collection_timeout(&self) -> Duration {
        Duration::from_secs(self.collection_timeout_secs)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
