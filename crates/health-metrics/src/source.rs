//! Metrics Sources
//!
//! The collector that produces raw readings lives outside this workspace.
//! It is reached through [`MetricsSource`], and every read is bounded by
//! [`collect_bounded`].

use crate::error::CollectionError;
use crate::snapshot::MetricSnapshot;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default budget for one collection
pub const DEFAULT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Supplier of one snapshot on demand
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Read the current value of every indicator the source knows about
    async fn collect(&self) -> Result<MetricSnapshot, CollectionError>;

    /// Short name for logs
    fn name(&self) -> &str {
        "metrics-source"
    }
}

/// Outcome of a bounded collection
#[derive(Debug, Clone)]
pub struct Collection {
    /// Snapshot to evaluate (the fallback snapshot on failure)
    pub snapshot: MetricSnapshot,
    /// Why the fallback was used, if it was
    pub error: Option<CollectionError>,
}

impl Collection {
    /// Whether the source answered normally
    pub fn is_nominal(&self) -> bool {
        self.error.is_none()
    }
}

/// Collect a snapshot within `timeout`.
///
/// On timeout or source error the fallback is a snapshot stamped now with no
/// indicators reported, so no rule can fire from missing data.
pub async fn collect_bounded(source: &dyn MetricsSource, timeout: Duration) -> Collection {
    let result = match tokio::time::timeout(timeout, source.collect()).await {
        Ok(result) => result,
        Err(_) => Err(CollectionError::Timeout(timeout.as_millis() as u64)),
    };

    match result {
        Ok(snapshot) => {
            debug!(
                "Collected {} indicators from {}",
                snapshot.reported_count(),
                source.name()
            );
            Collection {
                snapshot,
                error: None,
            }
        }
        Err(e) => {
            warn!("Collection from {} failed, using empty snapshot: {}", source.name(), e);
            Collection {
                snapshot: MetricSnapshot::empty(Utc::now()),
                error: Some(e),
            }
        }
    }
}

/// Source that returns the same readings every time, restamped on each read
pub struct StaticSource {
    template: MetricSnapshot,
}

impl StaticSource {
    /// Create a static source from a template snapshot
    pub fn new(template: MetricSnapshot) -> Self {
        Self { template }
    }
}

#[async_trait]
impl MetricsSource for StaticSource {
    async fn collect(&self) -> Result<MetricSnapshot, CollectionError> {
        let mut snapshot = self.template.clone();
        snapshot.timestamp = Utc::now();
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Source that replays a fixed sequence of results, then repeats the last one
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<MetricSnapshot, CollectionError>>>,
    last: Mutex<Option<Result<MetricSnapshot, CollectionError>>>,
}

impl ScriptedSource {
    /// Create a scripted source
    pub fn new(script: Vec<Result<MetricSnapshot, CollectionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl MetricsSource for ScriptedSource {
    async fn collect(&self) -> Result<MetricSnapshot, CollectionError> {
        let next = self
            .script
            .lock()
            .map_err(|e| CollectionError::Unavailable(format!("Lock error: {}", e)))?
            .pop_front();

        let mut last = self
            .last
            .lock()
            .map_err(|e| CollectionError::Unavailable(format!("Lock error: {}", e)))?;

        if let Some(result) = next {
            *last = Some(result);
        }

        last.clone()
            .unwrap_or_else(|| Err(CollectionError::Unavailable("empty script".to_string())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Source that reads an indicator document written by an external collector.
///
/// The document is a JSON object keyed by indicator name, optionally with an
/// RFC 3339 `timestamp`.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Create a source reading from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Reading metrics from {}", path.display());
        Self { path }
    }
}

#[async_trait]
impl MetricsSource for JsonFileSource {
    async fn collect(&self) -> Result<MetricSnapshot, CollectionError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| CollectionError::Malformed(e.to_string()))?;

        MetricSnapshot::from_json(&value, Utc::now())
            .ok_or_else(|| CollectionError::Malformed("expected a JSON object".to_string()))
    }

    fn name(&self) -> &str {
        "json-file"
    }
}
