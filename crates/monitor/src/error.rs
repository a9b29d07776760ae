//! Monitor error types

use thiserror::Error;
use tokio::task::JoinError;

/// A tick that did not run to completion
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Cycle panicked: {0}")]
    Panicked(String),
    #[error("Cycle was cancelled")]
    Cancelled,
}

impl From<JoinError> for CycleError {
    fn from(e: JoinError) -> Self {
        if e.is_cancelled() {
            return CycleError::Cancelled;
        }
        let payload = e.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        CycleError::Panicked(message)
    }
}

/// Configuration could not be loaded at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
