//! Status and per-cycle reports

use chrono::{DateTime, Utc};
use health_metrics::MetricSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trigger_rules::Urgency;

/// Point-in-time view of the engine. All-zero before the first tick, when
/// `most_recent_snapshot` is an empty snapshot stamped at engine creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub monitoring_active: bool,
    /// Triggers created since startup
    pub total_triggers: usize,
    pub pending_escalations: usize,
    pub overdue_escalations: usize,
    /// Active triggers per tier, every tier present
    pub urgency_distribution: BTreeMap<Urgency, usize>,
    pub advisory_enabled: bool,
    pub most_recent_snapshot: MetricSnapshot,
    pub consecutive_failure_count: u32,
    pub last_cycle_degraded: bool,
}

/// A step of a cycle that fell back to degraded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedStep {
    /// The source failed or timed out; the empty fallback snapshot was used
    Collection,
    /// At least one rule errored for a reason other than a missing indicator
    RuleEvaluation,
    /// A sink write failed after retries
    Persistence,
}

/// What one cycle did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// Ids of triggers created this cycle
    pub new_triggers: Vec<String>,
    /// Rules suppressed by the dedup window
    pub suppressed: Vec<String>,
    /// Escalation requests opened this cycle
    pub opened_escalations: Vec<String>,
    /// Escalation requests that absorbed a trigger this cycle
    pub merged_escalations: Vec<String>,
    /// Requests flipped to overdue by this cycle's sweep
    pub overdue: Vec<String>,
    pub degraded: Vec<DegradedStep>,
}

impl CycleReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            new_triggers: Vec::new(),
            suppressed: Vec::new(),
            opened_escalations: Vec::new(),
            merged_escalations: Vec::new(),
            overdue: Vec::new(),
            degraded: Vec::new(),
        }
    }

    /// Record a degraded step once
    pub fn mark(&mut self, step: DegradedStep) {
        if !self.degraded.contains(&step) {
            self.degraded.push(step);
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}
