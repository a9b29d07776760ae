//! Monitor: one engine, its collaborators, and the cycle that connects them

use crate::config::EngineConfig;
use crate::engine::{MonitorEngine, Processed};
use crate::status::{CycleReport, DegradedStep, SystemStatus};
use advisory::{AdvisoryPanel, HeuristicAdvisor};
use chrono::Utc;
use escalation::EscalationRequest;
use health_metrics::{collect_bounded, MetricsSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storage::{persist_with_retry, PersistenceSink, RetryPolicy, StorageError};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use trigger_rules::{SyntheticTrigger, ThresholdRuleSet, Trigger};

/// Shared handle to the engine and its collaborators
pub struct Monitor {
    engine: Mutex<MonitorEngine>,
    /// Held for a whole cycle, persistence included, so two cycles never interleave
    cycle: Mutex<()>,
    source: Arc<dyn MetricsSource>,
    sink: Arc<dyn PersistenceSink>,
    config: EngineConfig,
    active: AtomicBool,
}

impl Monitor {
    /// Build a monitor with the standard rule set.
    /// Heuristic advisors are registered when `advisory_enabled` is set.
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn MetricsSource>,
        sink: Arc<dyn PersistenceSink>,
    ) -> Self {
        let panel = if config.advisory_enabled {
            HeuristicAdvisor::all()
                .into_iter()
                .fold(AdvisoryPanel::new(), |panel, advisor| panel.with(advisor))
        } else {
            AdvisoryPanel::disabled()
        };
        Self::with_parts(config, ThresholdRuleSet::standard(), panel, source, sink)
    }

    /// Build a monitor from explicit parts
    pub fn with_parts(
        config: EngineConfig,
        rules: ThresholdRuleSet,
        panel: AdvisoryPanel,
        source: Arc<dyn MetricsSource>,
        sink: Arc<dyn PersistenceSink>,
    ) -> Self {
        info!(
            "Creating monitor: source {}, sink {}, interval {}s",
            source.name(),
            sink.name(),
            config.interval_secs
        );
        let engine = MonitorEngine::new(
            rules,
            panel,
            config.snapshot_history,
            config.trigger_history,
            config.persist_tail,
        );
        Self {
            engine: Mutex::new(engine),
            cycle: Mutex::new(()),
            source,
            sink,
            config,
            active: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one full cycle: collect, process, persist.
    ///
    /// Cycles are serialized end to end; a forced evaluation waits for the
    /// scheduled one in flight. Never fails; every step that fell back to
    /// degraded operation is listed in the returned report.
    pub async fn run_cycle(&self) -> CycleReport {
        let _cycle = self.cycle.lock().await;
        let collection = collect_bounded(self.source.as_ref(), self.config.collection_timeout()).await;

        let processed = {
            let mut engine = self.engine.lock().await;
            engine.process_snapshot(collection.snapshot, Utc::now())
        };

        let mut report = self.persist(processed).await;
        if collection.error.is_some() {
            report.mark(DegradedStep::Collection);
        }

        self.engine.lock().await.complete_cycle(report.is_degraded());
        if report.is_degraded() {
            warn!("Cycle degraded: {:?}", report.degraded);
        }
        report
    }

    /// Run a cycle now and return the resulting status
    pub async fn force_evaluation(&self) -> SystemStatus {
        info!("Forced evaluation requested");
        self.run_cycle().await;
        self.status().await
    }

    /// Inject an operator trigger; its escalation document is persisted like any other
    pub async fn inject_trigger(&self, synthetic: SyntheticTrigger) -> Trigger {
        let _cycle = self.cycle.lock().await;
        let (trigger, processed) = {
            let mut engine = self.engine.lock().await;
            engine.inject_trigger(synthetic, Utc::now())
        };
        self.persist(processed).await;
        trigger
    }

    /// Mark an escalation resolved. False for unknown or already resolved ids.
    pub async fn resolve_escalation(&self, id: &str) -> bool {
        self.engine.lock().await.resolve_escalation(id)
    }

    pub async fn status(&self) -> SystemStatus {
        self.engine.lock().await.status(self.is_active())
    }

    pub async fn active_triggers(&self) -> Vec<Trigger> {
        self.engine.lock().await.active_triggers()
    }

    pub async fn escalations(&self) -> Vec<EscalationRequest> {
        self.engine.lock().await.escalations()
    }

    /// Document of an escalation, from memory or else from the sink
    pub async fn escalation_document(&self, id: &str) -> Result<String, StorageError> {
        if let Some(document) = self.engine.lock().await.escalation_document(id) {
            return Ok(document);
        }
        self.sink.read_escalation(id).await
    }

    /// Count a cycle that did not complete; returns the new consecutive count
    pub async fn record_failure(&self) -> u32 {
        self.engine.lock().await.record_failure()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Hand a processing step's output to the sink. Runs under the cycle lock
    /// but outside the engine lock, so status reads are not blocked.
    async fn persist(&self, processed: Processed) -> CycleReport {
        let Processed {
            mut report,
            documents,
            snapshot_tail,
            trigger_tail,
        } = processed;
        let policy: RetryPolicy = self.config.persistence;
        let sink = self.sink.as_ref();

        for (request, document) in &documents {
            let result = persist_with_retry(&request.id, policy, move || {
                sink.write_escalation(request, document)
            })
            .await;
            if let Err(e) = result {
                // The request stays in memory; only the mirror is missing it
                error!("Failed to persist escalation {}: {}", request.id, e);
                report.mark(DegradedStep::Persistence);
            }
        }

        let snapshots = snapshot_tail.as_slice();
        if let Err(e) =
            persist_with_retry("snapshots", policy, move || sink.write_snapshots(snapshots)).await
        {
            error!("Failed to persist snapshot history: {}", e);
            report.mark(DegradedStep::Persistence);
        }

        let triggers = trigger_tail.as_slice();
        if let Err(e) =
            persist_with_retry("triggers", policy, move || sink.write_triggers(triggers)).await
        {
            error!("Failed to persist trigger history: {}", e);
            report.mark(DegradedStep::Persistence);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use health_metrics::{CollectionError, Indicator, MetricSnapshot, ScriptedSource, StaticSource};
    use storage::MemorySink;

    struct BrokenSink;

    #[async_trait]
    impl PersistenceSink for BrokenSink {
        async fn write_escalation(&self, _: &EscalationRequest, _: &str) -> Result<(), StorageError> {
            Err(StorageError::NotFound("disk gone".to_string()))
        }

        async fn write_snapshots(&self, _: &[MetricSnapshot]) -> Result<(), StorageError> {
            Err(StorageError::NotFound("disk gone".to_string()))
        }

        async fn write_triggers(&self, _: &[Trigger]) -> Result<(), StorageError> {
            Err(StorageError::NotFound("disk gone".to_string()))
        }

        async fn read_escalation(&self, id: &str) -> Result<String, StorageError> {
            Err(StorageError::NotFound(id.to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    /// Memory sink whose first snapshot write stalls
    struct SlowFirstWriteSink {
        inner: MemorySink,
        stalled: AtomicBool,
    }

    #[async_trait]
    impl PersistenceSink for SlowFirstWriteSink {
        async fn write_escalation(&self, request: &EscalationRequest, document: &str) -> Result<(), StorageError> {
            self.inner.write_escalation(request, document).await
        }

        async fn write_snapshots(&self, snapshots: &[MetricSnapshot]) -> Result<(), StorageError> {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
            self.inner.write_snapshots(snapshots).await
        }

        async fn write_triggers(&self, triggers: &[Trigger]) -> Result<(), StorageError> {
            self.inner.write_triggers(triggers).await
        }

        async fn read_escalation(&self, id: &str) -> Result<String, StorageError> {
            self.inner.read_escalation(id).await
        }

        fn name(&self) -> &str {
            "slow-first-write"
        }
    }

    struct StalledSource;

    #[async_trait]
    impl MetricsSource for StalledSource {
        async fn collect(&self) -> Result<MetricSnapshot, CollectionError> {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            Ok(MetricSnapshot::empty(Utc::now()))
        }
    }

    fn worker_failure() -> MetricSnapshot {
        MetricSnapshot::empty(Utc::now())
            .with(Indicator::WorkerHealthScore, 0.3)
            .with(Indicator::MemoryUsage, 0.4)
            .with(Indicator::QueueBacklog, 10.0)
    }

    #[tokio::test]
    async fn test_cycle_persists_document_and_tails() {
        let sink = Arc::new(MemorySink::new());
        let monitor = Monitor::new(
            EngineConfig::default(),
            Arc::new(StaticSource::new(worker_failure())),
            sink.clone(),
        );

        let report = monitor.run_cycle().await;
        assert!(!report.is_degraded());
        assert_eq!(report.opened_escalations.len(), 1);

        let id = &report.opened_escalations[0];
        assert_eq!(sink.escalation_ids(), vec![id.clone()]);
        assert_eq!(sink.snapshots().len(), 1);
        assert_eq!(sink.triggers().len(), 1);
        assert_eq!(
            monitor.escalation_document(id).await.unwrap(),
            sink.read_escalation(id).await.unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_cycles_do_not_regress_the_mirror() {
        let sink = Arc::new(SlowFirstWriteSink {
            inner: MemorySink::new(),
            stalled: AtomicBool::new(false),
        });
        let monitor = Arc::new(Monitor::new(
            EngineConfig::default(),
            Arc::new(StaticSource::new(worker_failure())),
            sink.clone(),
        ));

        let first = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.run_cycle().await }
        });
        let second = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.run_cycle().await }
        });
        let first = first.await.unwrap();
        let second = second.await.unwrap();
        assert!(!first.is_degraded());
        assert!(!second.is_degraded());

        let engine_snapshots = monitor.engine.lock().await.snapshots().len();
        assert_eq!(engine_snapshots, 2);
        assert_eq!(sink.inner.snapshots().len(), engine_snapshots);

        // Snapshots reach the history in collection order
        let history = monitor.engine.lock().await.snapshots().read_last(2);
        assert!(history[0].timestamp <= history[1].timestamp);
    }

    #[tokio::test]
    async fn test_forced_evaluation_is_idempotent() {
        let monitor = Monitor::new(
            EngineConfig::default(),
            Arc::new(StaticSource::new(worker_failure())),
            Arc::new(MemorySink::new()),
        );

        let first = monitor.force_evaluation().await;
        let second = monitor.force_evaluation().await;
        assert_eq!(first.total_triggers, 1);
        assert_eq!(second.total_triggers, first.total_triggers);
        assert_eq!(second.pending_escalations, first.pending_escalations);
        assert_eq!(second.urgency_distribution, first.urgency_distribution);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_degrades_but_keeps_state() {
        let monitor = Monitor::new(
            EngineConfig::default(),
            Arc::new(StaticSource::new(worker_failure())),
            Arc::new(BrokenSink),
        );

        let report = monitor.run_cycle().await;
        assert_eq!(report.degraded, vec![DegradedStep::Persistence]);

        let status = monitor.status().await;
        assert!(status.last_cycle_degraded);
        assert_eq!(status.pending_escalations, 1);
        assert_eq!(status.consecutive_failure_count, 0);

        // The in-memory copy still serves the document
        let id = &report.opened_escalations[0];
        assert!(monitor.escalation_document(id).await.is_ok());
        assert!(matches!(
            monitor.escalation_document("esc-unknown").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_source_uses_empty_snapshot() {
        let monitor = Monitor::new(
            EngineConfig::default(),
            Arc::new(StalledSource),
            Arc::new(MemorySink::new()),
        );

        let report = monitor.run_cycle().await;
        assert_eq!(report.degraded, vec![DegradedStep::Collection]);
        assert!(report.new_triggers.is_empty());

        let snapshot = monitor.status().await.most_recent_snapshot;
        assert_eq!(snapshot.reported_count(), 0);
    }

    #[tokio::test]
    async fn test_source_error_then_recovery() {
        let source = ScriptedSource::new(vec![
            Err(CollectionError::Unavailable("collector restarting".to_string())),
            Ok(worker_failure()),
        ]);
        let monitor = Monitor::new(EngineConfig::default(), Arc::new(source), Arc::new(MemorySink::new()));

        assert_eq!(monitor.run_cycle().await.degraded, vec![DegradedStep::Collection]);
        let report = monitor.run_cycle().await;
        assert!(!report.is_degraded());
        assert_eq!(report.new_triggers.len(), 1);
        assert!(!monitor.status().await.last_cycle_degraded);
    }

    #[tokio::test]
    async fn test_inject_and_resolve_through_monitor() {
        let sink = Arc::new(MemorySink::new());
        let monitor = Monitor::new(
            EngineConfig::default(),
            Arc::new(StaticSource::new(MetricSnapshot::empty(Utc::now()))),
            sink.clone(),
        );

        let trigger = monitor
            .inject_trigger(SyntheticTrigger {
                urgency: trigger_rules::Urgency::High,
                category: trigger_rules::Category::IntegrationChallenge,
                title: "contract drift".to_string(),
                description: String::new(),
                affected_systems: Default::default(),
                suggested_agenda: vec![],
            })
            .await;
        assert_eq!(monitor.active_triggers().await[0].id, trigger.id);

        let escalations = monitor.escalations().await;
        assert_eq!(escalations.len(), 1);
        assert_eq!(sink.escalation_ids(), vec![escalations[0].id.clone()]);

        assert!(monitor.resolve_escalation(&escalations[0].id).await);
        assert_eq!(monitor.status().await.pending_escalations, 0);
    }

    #[tokio::test]
    async fn test_advisory_enabled_registers_heuristics() {
        let config = EngineConfig {
            advisory_enabled: true,
            ..Default::default()
        };
        let monitor = Monitor::new(
            config,
            Arc::new(StaticSource::new(worker_failure())),
            Arc::new(MemorySink::new()),
        );

        assert!(monitor.status().await.advisory_enabled);
        monitor.run_cycle().await;
        let trigger = &monitor.active_triggers().await[0];
        assert!(trigger.advisory_input.is_some());
    }
}
