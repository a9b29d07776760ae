//! Trigger Evaluator Implementation

use crate::annotations::{AdvisoryResult, AutoAnalysis};
use crate::error::RuleEvaluationError;
use crate::rule::{ThresholdRuleSet, Urgency};
use crate::trigger::Trigger;
use chrono::Duration;
use health_metrics::MetricSnapshot;
use ring_buffer::RingBuffer;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info};

/// Re-breach suppression window
pub const DEDUP_WINDOW_HOURS: i64 = 24;

/// Result of evaluating the rule set against one snapshot
#[derive(Debug, Clone, Default)]
pub struct EvaluationReport {
    /// Triggers created by this evaluation, in rule order
    pub triggers: Vec<Trigger>,
    /// Names of rules that breached but were suppressed by the dedup window
    pub suppressed: Vec<String>,
    /// Rules that could not be evaluated
    pub errors: Vec<RuleEvaluationError>,
}

impl EvaluationReport {
    /// Errors other than indicators the source did not report
    pub fn hard_errors(&self) -> impl Iterator<Item = &RuleEvaluationError> {
        self.errors.iter().filter(|e| !e.is_missing_indicator())
    }
}

/// Applies the rule set and owns the active trigger registry
pub struct TriggerEvaluator {
    /// Static rule table
    rules: ThresholdRuleSet,
    /// Suppression window for same-id re-breaches
    dedup_window: Duration,
    /// Latest trigger per id
    active: HashMap<String, Trigger>,
    /// Every trigger created, bounded
    history: RingBuffer<Trigger>,
}

impl TriggerEvaluator {
    /// Create an evaluator with the default 24h window
    pub fn new(rules: ThresholdRuleSet, history_capacity: usize) -> Self {
        info!("Creating trigger evaluator with {} rules", rules.len());
        Self {
            rules,
            dedup_window: Duration::hours(DEDUP_WINDOW_HOURS),
            active: HashMap::new(),
            history: RingBuffer::new(history_capacity),
        }
    }

    /// Evaluate every rule against `snapshot`, tiers critical to low.
    ///
    /// A rule that fails to evaluate is skipped and reported; the remaining
    /// rules still run. New triggers are recorded in the registry before
    /// returning.
    pub fn evaluate(&mut self, snapshot: &MetricSnapshot) -> EvaluationReport {
        let mut report = EvaluationReport::default();

        for rule in self.rules.iter() {
            let value = match rule.condition.check(snapshot) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(kind) => {
                    let err = RuleEvaluationError {
                        rule: rule.name.to_string(),
                        rule_id: rule.id(),
                        kind,
                    };
                    if err.is_missing_indicator() {
                        debug!("{}", err);
                    } else {
                        error!("{}", err);
                    }
                    report.errors.push(err);
                    continue;
                }
            };

            let id = rule.id();
            if let Some(existing) = self.active.get(&id) {
                if existing.suppresses_at(snapshot.timestamp, self.dedup_window) {
                    debug!(
                        "Trigger {} ({}) suppressed, last fired at {}",
                        rule.name, id, existing.triggered_at
                    );
                    report.suppressed.push(rule.name.to_string());
                    continue;
                }
            }

            let trigger = Trigger::from_rule(rule, snapshot, value);
            info!(
                "Trigger fired: [{}] {} {} ({})",
                trigger.urgency, trigger.category, trigger.title, trigger.id
            );
            self.history.push(trigger.clone());
            self.active.insert(id, trigger.clone());
            report.triggers.push(trigger);
        }

        report
    }

    /// Record a trigger, superseding any entry with the same id
    pub fn record(&mut self, trigger: Trigger) {
        self.history.push(trigger.clone());
        self.active.insert(trigger.id.clone(), trigger);
    }

    /// Attach analysis and advisory input to the latest trigger with `id`
    pub fn annotate(
        &mut self,
        id: &str,
        analysis: Option<AutoAnalysis>,
        advisory: Option<AdvisoryResult>,
    ) -> Option<&Trigger> {
        if let Some(entry) = self.history.iter_mut().rev().find(|t| t.id == id) {
            entry.auto_analysis = analysis.clone();
            entry.advisory_input = advisory.clone();
        }

        let trigger = self.active.get_mut(id)?;
        trigger.auto_analysis = analysis;
        trigger.advisory_input = advisory;
        Some(trigger)
    }

    /// Active trigger by id
    pub fn get(&self, id: &str) -> Option<&Trigger> {
        self.active.get(id)
    }

    /// Active triggers, oldest first
    pub fn active_triggers(&self) -> Vec<&Trigger> {
        let mut triggers: Vec<&Trigger> = self.active.values().collect();
        triggers.sort_by(|a, b| a.triggered_at.cmp(&b.triggered_at).then_with(|| a.id.cmp(&b.id)));
        triggers
    }

    /// Number of active triggers
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active triggers per urgency tier (every tier present, possibly zero)
    pub fn urgency_distribution(&self) -> BTreeMap<Urgency, usize> {
        let mut distribution: BTreeMap<Urgency, usize> =
            Urgency::TIERS.iter().map(|u| (*u, 0)).collect();
        for trigger in self.active.values() {
            *distribution.entry(trigger.urgency).or_default() += 1;
        }
        distribution
    }

    /// Trigger history, oldest first
    pub fn history(&self) -> &RingBuffer<Trigger> {
        &self.history
    }

    /// Total triggers ever created
    pub fn total_created(&self) -> usize {
        self.history.total_written()
    }
}
