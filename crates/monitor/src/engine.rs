//! Monitor Engine
//!
//! Synchronous core of a tick. Holds every registry and the rule set; the
//! [`Monitor`](crate::Monitor) serializes access to it.

use crate::status::{CycleReport, DegradedStep, SystemStatus};
use advisory::AdvisoryPanel;
use auto_analysis::AutoAnalysisBuilder;
use chrono::{DateTime, Utc};
use escalation::{EscalationCoordinator, EscalationOutcome, EscalationRequest};
use health_metrics::MetricSnapshot;
use metrics::{counter, gauge};
use ring_buffer::RingBuffer;
use tracing::{debug, info};
use trend_engine::{TrendAnalyzer, TrendReport};
use trigger_rules::{SyntheticTrigger, ThresholdRuleSet, Trigger, TriggerEvaluator};

/// Output of a processing step, to be persisted outside the engine lock
#[derive(Debug, Clone)]
pub struct Processed {
    pub report: CycleReport,
    /// Requests opened or merged into this step, with their current documents
    pub documents: Vec<(EscalationRequest, String)>,
    /// Most recent snapshots, oldest first
    pub snapshot_tail: Vec<MetricSnapshot>,
    /// Most recent triggers, oldest first
    pub trigger_tail: Vec<Trigger>,
}

/// Single-writer engine state
pub struct MonitorEngine {
    snapshots: RingBuffer<MetricSnapshot>,
    evaluator: TriggerEvaluator,
    trends: TrendAnalyzer,
    analysis: AutoAnalysisBuilder,
    advisory: AdvisoryPanel,
    escalations: EscalationCoordinator,
    /// Entries of each history handed to the sink per step
    persist_tail: usize,
    consecutive_failures: u32,
    last_cycle_degraded: bool,
    /// Stamp of the empty snapshot reported before the first tick
    started_at: DateTime<Utc>,
}

impl MonitorEngine {
    /// Create an engine with empty registries
    pub fn new(
        rules: ThresholdRuleSet,
        advisory: AdvisoryPanel,
        snapshot_history: usize,
        trigger_history: usize,
        persist_tail: usize,
    ) -> Self {
        info!(
            "Creating monitor engine: {} rules, {} advisors, history {}/{}",
            rules.len(),
            advisory.len(),
            snapshot_history,
            trigger_history
        );
        Self {
            snapshots: RingBuffer::new(snapshot_history),
            evaluator: TriggerEvaluator::new(rules, trigger_history),
            trends: TrendAnalyzer::new(),
            analysis: AutoAnalysisBuilder::new(),
            advisory,
            escalations: EscalationCoordinator::new(),
            persist_tail,
            consecutive_failures: 0,
            last_cycle_degraded: false,
            started_at: Utc::now(),
        }
    }

    /// Run one tick's processing against a collected snapshot.
    ///
    /// Order: history append, rule evaluation, then per new trigger analysis,
    /// advisory and escalation, then the deadline sweep.
    pub fn process_snapshot(&mut self, snapshot: MetricSnapshot, now: DateTime<Utc>) -> Processed {
        let mut report = CycleReport::new(now);
        let mut documents = Vec::new();

        self.snapshots.push(snapshot.clone());
        let evaluation = self.evaluator.evaluate(&snapshot);

        if evaluation.hard_errors().next().is_some() {
            report.mark(DegradedStep::RuleEvaluation);
        }
        counter!("trigger_engine_suppressed_total").increment(evaluation.suppressed.len() as u64);
        report.suppressed = evaluation.suppressed;

        if !evaluation.triggers.is_empty() {
            let trends = self.trends.analyze(self.snapshots.iter());
            for trigger in &evaluation.triggers {
                counter!("trigger_engine_triggers_total", "urgency" => trigger.urgency.as_str())
                    .increment(1);
                report.new_triggers.push(trigger.id.clone());
                self.follow_up(trigger, &trends, now, &mut report, &mut documents);
            }
        }

        self.sweep(now, &mut report);
        self.processed(report, documents)
    }

    /// Record an operator-supplied trigger and send it through analysis,
    /// advisory and escalation. Not subject to the dedup window.
    pub fn inject_trigger(&mut self, synthetic: SyntheticTrigger, now: DateTime<Utc>) -> (Trigger, Processed) {
        let mut report = CycleReport::new(now);
        let mut documents = Vec::new();

        let snapshot = self
            .snapshots
            .latest()
            .cloned()
            .unwrap_or_else(|| MetricSnapshot::empty(now));
        let trigger = synthetic.into_trigger(snapshot, now);
        info!(
            "Synthetic trigger injected: [{}] {} {} ({})",
            trigger.urgency, trigger.category, trigger.title, trigger.id
        );
        counter!("trigger_engine_synthetic_total").increment(1);
        self.evaluator.record(trigger.clone());
        report.new_triggers.push(trigger.id.clone());

        let trends = self.trends.analyze(self.snapshots.iter());
        self.follow_up(&trigger, &trends, now, &mut report, &mut documents);

        let annotated = self.evaluator.get(&trigger.id).cloned().unwrap_or(trigger);
        (annotated, self.processed(report, documents))
    }

    fn follow_up(
        &mut self,
        trigger: &Trigger,
        trends: &TrendReport,
        now: DateTime<Utc>,
        report: &mut CycleReport,
        documents: &mut Vec<(EscalationRequest, String)>,
    ) {
        let analysis = self.analysis.build(trigger, trends);
        let advisory = self.advisory.consult(trigger);
        let Some(annotated) = self.evaluator.annotate(&trigger.id, Some(analysis), advisory) else {
            return;
        };
        let annotated = annotated.clone();

        match self.escalations.handle(&annotated, trends, now) {
            Some(EscalationOutcome::Opened { request_id, document }) => {
                counter!("trigger_engine_escalations_opened_total").increment(1);
                if let Some(request) = self.escalations.get(&request_id) {
                    documents.push((request.clone(), document));
                }
                report.opened_escalations.push(request_id);
            }
            Some(EscalationOutcome::Merged { request_id, document }) => {
                counter!("trigger_engine_escalations_merged_total").increment(1);
                if let Some(request) = self.escalations.get(&request_id) {
                    documents.push((request.clone(), document));
                }
                report.merged_escalations.push(request_id);
            }
            None => {}
        }
    }

    fn sweep(&mut self, now: DateTime<Utc>, report: &mut CycleReport) {
        let overdue = self.escalations.sweep(now);
        if !overdue.is_empty() {
            counter!("trigger_engine_escalations_overdue_total").increment(overdue.len() as u64);
        }
        report.overdue = overdue;
        gauge!("trigger_engine_pending_escalations").set(self.escalations.pending_count() as f64);
        gauge!("trigger_engine_overdue_escalations").set(self.escalations.overdue_count() as f64);
    }

    fn processed(&self, report: CycleReport, documents: Vec<(EscalationRequest, String)>) -> Processed {
        debug!(
            "Processed step: {} new triggers, {} opened, {} merged, {} overdue",
            report.new_triggers.len(),
            report.opened_escalations.len(),
            report.merged_escalations.len(),
            report.overdue.len()
        );
        Processed {
            report,
            documents,
            snapshot_tail: self.snapshots.read_last(self.persist_tail),
            trigger_tail: self.evaluator.history().read_last(self.persist_tail),
        }
    }

    /// Move an escalation to resolved
    pub fn resolve_escalation(&mut self, id: &str) -> bool {
        let resolved = self.escalations.resolve(id);
        if resolved {
            counter!("trigger_engine_escalations_resolved_total").increment(1);
            gauge!("trigger_engine_pending_escalations").set(self.escalations.pending_count() as f64);
            gauge!("trigger_engine_overdue_escalations").set(self.escalations.overdue_count() as f64);
        }
        resolved
    }

    /// Close out a cycle that ran to completion
    pub fn complete_cycle(&mut self, degraded: bool) {
        self.consecutive_failures = 0;
        self.last_cycle_degraded = degraded;
        if degraded {
            counter!("trigger_engine_degraded_cycles_total").increment(1);
        }
    }

    /// Count a cycle that panicked or was aborted
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures += 1;
        self.last_cycle_degraded = true;
        counter!("trigger_engine_cycle_failures_total").increment(1);
        self.consecutive_failures
    }

    pub fn status(&self, monitoring_active: bool) -> SystemStatus {
        SystemStatus {
            monitoring_active,
            total_triggers: self.evaluator.total_created(),
            pending_escalations: self.escalations.pending_count(),
            overdue_escalations: self.escalations.overdue_count(),
            urgency_distribution: self.evaluator.urgency_distribution(),
            advisory_enabled: self.advisory.is_enabled(),
            most_recent_snapshot: self
                .snapshots
                .latest()
                .cloned()
                .unwrap_or_else(|| MetricSnapshot::empty(self.started_at)),
            consecutive_failure_count: self.consecutive_failures,
            last_cycle_degraded: self.last_cycle_degraded,
        }
    }

    /// Active triggers, oldest first
    pub fn active_triggers(&self) -> Vec<Trigger> {
        self.evaluator.active_triggers().into_iter().cloned().collect()
    }

    /// All escalation requests, oldest first
    pub fn escalations(&self) -> Vec<EscalationRequest> {
        self.escalations.requests().to_vec()
    }

    /// Rendered document of a request, if it was opened by this engine
    pub fn escalation_document(&self, id: &str) -> Option<String> {
        self.escalations.document(id).map(str::to_string)
    }

    pub fn snapshots(&self) -> &RingBuffer<MetricSnapshot> {
        &self.snapshots
    }
}
