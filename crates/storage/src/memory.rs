//! In-memory sink

use crate::sink::PersistenceSink;
use crate::StorageError;
use async_trait::async_trait;
use escalation::EscalationRequest;
use health_metrics::MetricSnapshot;
use std::collections::HashMap;
use std::sync::Mutex;
use trigger_rules::Trigger;

/// Sink keeping everything in memory, for tests and dry runs
#[derive(Debug, Default)]
pub struct MemorySink {
    escalations: Mutex<HashMap<String, String>>,
    snapshots: Mutex<Vec<MetricSnapshot>>,
    triggers: Mutex<Vec<Trigger>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last snapshot tail written
    pub fn snapshots(&self) -> Vec<MetricSnapshot> {
        self.snapshots.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Last trigger tail written
    pub fn triggers(&self) -> Vec<Trigger> {
        self.triggers.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Ids of stored escalation documents
    pub fn escalation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .escalations
            .lock()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    fn lock_error<T>(e: std::sync::PoisonError<T>) -> StorageError {
        StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, format!("Lock error: {}", e)))
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn write_escalation(
        &self,
        request: &EscalationRequest,
        document: &str,
    ) -> Result<(), StorageError> {
        self.escalations
            .lock()
            .map_err(Self::lock_error)?
            .insert(request.id.clone(), document.to_string());
        Ok(())
    }

    async fn write_snapshots(&self, tail: &[MetricSnapshot]) -> Result<(), StorageError> {
        *self.snapshots.lock().map_err(Self::lock_error)? = tail.to_vec();
        Ok(())
    }

    async fn write_triggers(&self, tail: &[Trigger]) -> Result<(), StorageError> {
        *self.triggers.lock().map_err(Self::lock_error)? = tail.to_vec();
        Ok(())
    }

    async fn read_escalation(&self, id: &str) -> Result<String, StorageError> {
        self.escalations
            .lock()
            .map_err(Self::lock_error)?
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
