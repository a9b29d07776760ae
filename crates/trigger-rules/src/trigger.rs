//! Trigger Model

use crate::annotations::{AdvisoryResult, AutoAnalysis};
use crate::rule::{Category, ThresholdRule, Urgency};
use chrono::{DateTime, Utc};
use health_metrics::MetricSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stable trigger id for a rule identity.
///
/// First 16 hex chars of the BLAKE3 digest of `"<TIER>:<name>"`. The id never
/// depends on snapshot content, so repeated breaches of one rule share it.
pub fn trigger_id(tier: Urgency, name: &str) -> String {
    let digest = blake3::hash(format!("{}:{}", tier.as_str(), name).as_bytes());
    digest.to_hex().as_str()[..16].to_string()
}

/// One deduplicated detection of a threshold breach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    /// Name of the rule that fired
    pub rule: String,
    pub category: Category,
    pub urgency: Urgency,
    pub title: String,
    pub description: String,
    pub triggered_at: DateTime<Utc>,
    /// Snapshot that breached the rule
    pub snapshot: MetricSnapshot,
    pub affected_systems: BTreeSet<String>,
    pub suggested_agenda: Vec<String>,
    #[serde(default)]
    pub auto_analysis: Option<AutoAnalysis>,
    #[serde(default)]
    pub advisory_input: Option<AdvisoryResult>,
}

impl Trigger {
    /// Instantiate a rule's template for a breaching value
    pub fn from_rule(rule: &ThresholdRule, snapshot: &MetricSnapshot, value: f64) -> Self {
        Self {
            id: rule.id(),
            rule: rule.name.to_string(),
            category: rule.category,
            urgency: rule.tier,
            title: rule.template.title.to_string(),
            description: (rule.template.describe)(value),
            triggered_at: snapshot.timestamp,
            snapshot: snapshot.clone(),
            affected_systems: rule
                .template
                .affected_systems
                .iter()
                .map(|s| s.to_string())
                .collect(),
            suggested_agenda: rule
                .template
                .suggested_agenda
                .iter()
                .map(|s| s.to_string())
                .collect(),
            auto_analysis: None,
            advisory_input: None,
        }
    }

    /// Whether this trigger still suppresses a re-breach at `now`
    pub fn suppresses_at(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        now - self.triggered_at < window
    }
}

/// Operator-injected trigger, used to exercise the escalation path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticTrigger {
    pub urgency: Urgency,
    pub category: Category,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub affected_systems: BTreeSet<String>,
    #[serde(default)]
    pub suggested_agenda: Vec<String>,
}

impl SyntheticTrigger {
    /// Rule name recorded on the resulting trigger
    pub fn rule_name(&self) -> String {
        format!("synthetic:{}", self.title)
    }

    /// Materialize the trigger against a snapshot (usually the latest one)
    pub fn into_trigger(self, snapshot: MetricSnapshot, now: DateTime<Utc>) -> Trigger {
        let rule = self.rule_name();
        Trigger {
            id: trigger_id(self.urgency, &rule),
            rule,
            category: self.category,
            urgency: self.urgency,
            title: self.title,
            description: self.description,
            triggered_at: now,
            snapshot,
            affected_systems: self.affected_systems,
            suggested_agenda: self.suggested_agenda,
            auto_analysis: None,
            advisory_input: None,
        }
    }
}
