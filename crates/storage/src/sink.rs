//! Persistence sink contract and bounded retry

use crate::StorageError;
use async_trait::async_trait;
use escalation::EscalationRequest;
use health_metrics::MetricSnapshot;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use trigger_rules::Trigger;

/// Destination for persisted engine state
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store the document of a newly opened request, addressed by its id
    async fn write_escalation(
        &self,
        request: &EscalationRequest,
        document: &str,
    ) -> Result<(), StorageError>;

    /// Replace the stored snapshot tail
    async fn write_snapshots(&self, tail: &[MetricSnapshot]) -> Result<(), StorageError>;

    /// Replace the stored trigger tail
    async fn write_triggers(&self, tail: &[Trigger]) -> Result<(), StorageError>;

    /// Read back an escalation document
    async fn read_escalation(&self, id: &str) -> Result<String, StorageError>;

    /// Sink name for logs
    fn name(&self) -> &str;
}

/// Retry settings for sink writes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts before giving up (at least one is always made)
    pub max_attempts: u8,
    /// Timeout applied to each attempt (milliseconds)
    pub attempt_timeout_ms: u64,
    /// Pause between attempts, doubled each time (milliseconds)
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_ms: 5000,
            backoff_ms: 100,
        }
    }
}

/// Run a sink operation with bounded attempts and a per-attempt timeout.
/// Returns the last error once attempts are exhausted.
pub async fn persist_with_retry<F, Fut>(
    what: &str,
    policy: RetryPolicy,
    mut op: F,
) -> Result<(), StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), StorageError>>,
{
    let attempts = policy.max_attempts.max(1);
    let timeout = Duration::from_millis(policy.attempt_timeout_ms);
    let mut backoff = Duration::from_millis(policy.backoff_ms);
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(policy.attempt_timeout_ms)),
        };

        match result {
            Ok(()) => {
                debug!("Persisted {} (attempt {})", what, attempt);
                return Ok(());
            }
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!("Persisting {} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
        }
    }
}
