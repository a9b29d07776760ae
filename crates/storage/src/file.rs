//! File-backed sink
//!
//! Layout under the root directory:
//!
//! ```text
//! snapshots.json
//! triggers.json
//! escalations/<request id>.md
//! ```
//!
//! Every write goes to a uniquely named sibling `.tmp` file first and is
//! renamed into place, so readers never observe a partially written file
//! and concurrent writers never share a temporary.

use crate::sink::PersistenceSink;
use crate::StorageError;
use async_trait::async_trait;
use escalation::EscalationRequest;
use health_metrics::MetricSnapshot;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, info};
use trigger_rules::Trigger;

const SNAPSHOTS_FILE: &str = "snapshots.json";
const TRIGGERS_FILE: &str = "triggers.json";
const ESCALATIONS_DIR: &str = "escalations";

/// Sequence for temporary file names within this process
static TMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Sink writing JSON and Markdown files below a root directory
#[derive(Debug, Clone)]
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    /// Create a sink rooted at `root`; directories are created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("Creating file sink at {}", root.display());
        Self { root }
    }

    fn escalation_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        // Ids become file names; anything that could leave the directory is unknown
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(self.root.join(ESCALATIONS_DIR).join(format!("{}.md", id)))
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let sequence = TMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(format!(".{}.{}.tmp", std::process::id(), sequence));
        let tmp = path.with_file_name(tmp_name);

        fs::write(&tmp, contents).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!("Wrote {} ({} bytes)", path.display(), contents.len());
        Ok(())
    }
}

#[async_trait]
impl PersistenceSink for FileSink {
    async fn write_escalation(
        &self,
        request: &EscalationRequest,
        document: &str,
    ) -> Result<(), StorageError> {
        let path = self.escalation_path(&request.id)?;
        self.write_atomic(&path, document.as_bytes()).await
    }

    async fn write_snapshots(&self, tail: &[MetricSnapshot]) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(tail)?;
        self.write_atomic(&self.root.join(SNAPSHOTS_FILE), &json).await
    }

    async fn write_triggers(&self, tail: &[Trigger]) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(tail)?;
        self.write_atomic(&self.root.join(TRIGGERS_FILE), &json).await
    }

    async fn read_escalation(&self, id: &str) -> Result<String, StorageError> {
        let path = self.escalation_path(id)?;
        match fs::read_to_string(&path).await {
            Ok(document) => Ok(document),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use health_metrics::Indicator;
    use trigger_rules::{Category, SyntheticTrigger, Urgency};

    fn leftover_tmp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    fn request() -> EscalationRequest {
        let trigger = SyntheticTrigger {
            urgency: Urgency::Critical,
            category: Category::SystemFailure,
            title: "drill".to_string(),
            description: String::new(),
            affected_systems: Default::default(),
            suggested_agenda: vec![],
        }
        .into_trigger(MetricSnapshot::empty(Utc::now()), Utc::now());
        EscalationRequest::open(&trigger, Utc::now())
    }

    #[tokio::test]
    async fn test_escalation_document_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        let request = request();

        sink.write_escalation(&request, "# doc\n").await.unwrap();
        assert_eq!(sink.read_escalation(&request.id).await.unwrap(), "# doc\n");

        let path = dir.path().join("escalations").join(format!("{}.md", request.id));
        assert!(path.exists());
        assert!(leftover_tmp_files(&dir.path().join("escalations")).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_use_distinct_temporaries() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                tokio::spawn(async move {
                    let snapshot = MetricSnapshot::empty(Utc::now()).with(Indicator::QueueBacklog, i as f64);
                    sink.write_snapshots(&vec![snapshot; i + 1]).await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let raw = std::fs::read_to_string(dir.path().join("snapshots.json")).unwrap();
        let stored: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert!((1..=8).contains(&stored.len()));
        assert!(leftover_tmp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_tails_replace_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        let snapshot = MetricSnapshot::empty(Utc::now()).with(Indicator::CpuUsage, 0.4);

        sink.write_snapshots(&[snapshot.clone(), snapshot.clone()]).await.unwrap();
        sink.write_snapshots(&[snapshot]).await.unwrap();
        sink.write_triggers(&[]).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("snapshots.json")).unwrap();
        let stored: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["cpu_usage"], 0.4);

        let raw = std::fs::read_to_string(dir.path().join("triggers.json")).unwrap();
        assert_eq!(raw.trim(), "[]");
    }

    #[tokio::test]
    async fn test_unknown_and_unsafe_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());

        assert!(matches!(
            sink.read_escalation("esc-missing").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            sink.read_escalation("../snapshots").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
