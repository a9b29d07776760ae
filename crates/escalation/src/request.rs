//! Escalation Request Model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use trigger_rules::{Category, Trigger, Urgency};

/// Time allowed to act on a request of a given urgency
pub fn deadline_window(urgency: Urgency) -> Duration {
    match urgency {
        Urgency::Critical => Duration::hours(24),
        Urgency::High => Duration::days(7),
        Urgency::Medium => Duration::days(30),
        Urgency::Low => Duration::days(90),
    }
}

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    Pending,
    Overdue,
    Resolved,
}

impl EscalationStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationStatus::Pending => "pending",
            EscalationStatus::Overdue => "overdue",
            EscalationStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for EscalationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group of related triggers awaiting a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRequest {
    pub id: String,
    /// Urgency of the trigger that opened the request
    pub urgency: Urgency,
    pub categories: BTreeSet<Category>,
    pub trigger_ids: Vec<String>,
    /// Agenda items in arrival order, duplicates kept
    pub agenda: Vec<String>,
    pub affected_systems: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub status: EscalationStatus,
}

impl EscalationRequest {
    /// Open a pending request for a trigger
    pub fn open(trigger: &Trigger, now: DateTime<Utc>) -> Self {
        let short_id = trigger.id.get(..8).unwrap_or(&trigger.id);
        Self {
            id: format!("esc-{}-{}", now.format("%Y%m%dT%H%M%S"), short_id),
            urgency: trigger.urgency,
            categories: BTreeSet::from([trigger.category]),
            trigger_ids: vec![trigger.id.clone()],
            agenda: trigger.suggested_agenda.clone(),
            affected_systems: trigger.affected_systems.clone(),
            created_at: now,
            deadline: now + deadline_window(trigger.urgency),
            status: EscalationStatus::Pending,
        }
    }

    /// Fold a related trigger into this request.
    /// Urgency and deadline stay as opened.
    pub fn absorb(&mut self, trigger: &Trigger) {
        self.categories.insert(trigger.category);
        self.trigger_ids.push(trigger.id.clone());
        self.agenda.extend(trigger.suggested_agenda.iter().cloned());
        self.affected_systems
            .extend(trigger.affected_systems.iter().cloned());
    }

    pub fn is_pending(&self) -> bool {
        self.status == EscalationStatus::Pending
    }

    /// Whether the deadline has strictly passed at `now`
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }
}
