//! Escalation Coordinator Implementation

use crate::deadline::DeadlineMonitor;
use crate::document::render_document;
use crate::request::{EscalationRequest, EscalationStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use trend_engine::TrendReport;
use trigger_rules::{Category, Trigger};
use tracing::{debug, info};

/// What the coordinator did with a trigger
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationOutcome {
    /// A new request was opened; the document should be persisted under `request_id`
    Opened { request_id: String, document: String },
    /// The trigger joined an existing pending request; `document` is the re-rendered copy
    Merged { request_id: String, document: String },
}

impl EscalationOutcome {
    pub fn request_id(&self) -> &str {
        match self {
            EscalationOutcome::Opened { request_id, .. } => request_id,
            EscalationOutcome::Merged { request_id, .. } => request_id,
        }
    }

    /// Current rendered document of the touched request
    pub fn document(&self) -> &str {
        match self {
            EscalationOutcome::Opened { document, .. } => document,
            EscalationOutcome::Merged { document, .. } => document,
        }
    }
}

/// Owns the escalation registry. Does no I/O.
#[derive(Debug, Default)]
pub struct EscalationCoordinator {
    /// Requests in creation order
    requests: Vec<EscalationRequest>,
    /// Rendered documents by request id
    documents: HashMap<String, String>,
    /// Trigger that opened each request, kept for re-rendering
    openers: HashMap<String, Trigger>,
    deadlines: DeadlineMonitor,
}

impl EscalationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Escalate a HIGH or CRITICAL trigger. Lower tiers are ignored.
    pub fn handle(
        &mut self,
        trigger: &Trigger,
        trends: &TrendReport,
        now: DateTime<Utc>,
    ) -> Option<EscalationOutcome> {
        if !trigger.urgency.is_escalated() {
            debug!("Trigger {} at {} is not escalated", trigger.id, trigger.urgency);
            return None;
        }

        if let Some(index) = self.pending_index(trigger.category, now) {
            let request = &mut self.requests[index];
            request.absorb(trigger);
            info!(
                "Trigger {} merged into escalation {} ({} triggers)",
                trigger.id,
                request.id,
                request.trigger_ids.len()
            );
            let request_id = request.id.clone();
            let opener = self.openers.get(&request_id).unwrap_or(trigger);
            let document = render_document(request, opener, trends);
            self.documents.insert(request_id.clone(), document.clone());
            return Some(EscalationOutcome::Merged {
                request_id,
                document,
            });
        }

        let mut request = EscalationRequest::open(trigger, now);
        if self.get(&request.id).is_some() {
            let base = request.id.clone();
            let mut n = 2;
            while self.get(&request.id).is_some() {
                request.id = format!("{}-{}", base, n);
                n += 1;
            }
        }

        let document = render_document(&request, trigger, trends);
        info!(
            "Escalation {} opened: [{}] {}, deadline {}",
            request.id, request.urgency, trigger.category, request.deadline
        );

        let request_id = request.id.clone();
        self.documents.insert(request_id.clone(), document.clone());
        self.openers.insert(request_id.clone(), trigger.clone());
        self.requests.push(request);

        Some(EscalationOutcome::Opened {
            request_id,
            document,
        })
    }

    /// Earliest-created request covering `category` that is still pending
    /// and not yet past its deadline at `now`
    fn pending_index(&self, category: Category, now: DateTime<Utc>) -> Option<usize> {
        self.requests
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.is_pending() && !r.is_past_deadline(now) && r.categories.contains(&category)
            })
            .min_by_key(|(_, r)| r.created_at)
            .map(|(index, _)| index)
    }

    /// Flip pending requests past their deadline; returns the flipped ids
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<String> {
        self.deadlines.sweep(&mut self.requests, now)
    }

    /// Mark a pending or overdue request resolved.
    /// Returns false for unknown or already resolved ids.
    pub fn resolve(&mut self, id: &str) -> bool {
        match self.requests.iter_mut().find(|r| r.id == id) {
            Some(request) if request.status != EscalationStatus::Resolved => {
                info!("Escalation {} resolved (was {})", request.id, request.status);
                request.status = EscalationStatus::Resolved;
                true
            }
            Some(_) => false,
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&EscalationRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    /// Rendered document of a request
    pub fn document(&self, id: &str) -> Option<&str> {
        self.documents.get(id).map(String::as_str)
    }

    /// All requests, oldest first
    pub fn requests(&self) -> &[EscalationRequest] {
        &self.requests
    }

    pub fn pending_count(&self) -> usize {
        self.count(EscalationStatus::Pending)
    }

    pub fn overdue_count(&self) -> usize {
        self.count(EscalationStatus::Overdue)
    }

    fn count(&self, status: EscalationStatus) -> usize {
        self.requests.iter().filter(|r| r.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use health_metrics::{Indicator, MetricSnapshot};
    use trigger_rules::{SyntheticTrigger, ThresholdRuleSet, Urgency};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 2, 8, 0, 0).unwrap()
    }

    fn rule_trigger(rule: &str, indicator: Indicator, value: f64, at: DateTime<Utc>) -> Trigger {
        let rules = ThresholdRuleSet::standard();
        let rule = rules.get(rule).unwrap();
        let snapshot = MetricSnapshot::empty(at).with(indicator, value);
        Trigger::from_rule(rule, &snapshot, value)
    }

    fn synthetic(urgency: Urgency, category: Category, title: &str) -> Trigger {
        SyntheticTrigger {
            urgency,
            category,
            title: title.to_string(),
            description: String::new(),
            affected_systems: ["ops".to_string()].into(),
            suggested_agenda: vec!["Review".to_string()],
        }
        .into_trigger(MetricSnapshot::empty(t0()), t0())
    }

    #[test]
    fn test_low_tiers_are_not_escalated() {
        let mut coordinator = EscalationCoordinator::new();
        let medium = rule_trigger("learning_stagnation", Indicator::LearningVelocity, 0.05, t0());
        assert_eq!(medium.urgency, Urgency::Medium);

        assert!(coordinator.handle(&medium, &TrendReport::default(), t0()).is_none());
        assert!(coordinator.requests().is_empty());
    }

    #[test]
    fn test_opened_then_merged() {
        let mut coordinator = EscalationCoordinator::new();
        let trends = TrendReport::default();
        let first = rule_trigger("worker_health_critical", Indicator::WorkerHealthScore, 0.3, t0());
        let second = rule_trigger("memory_exhaustion", Indicator::MemoryUsage, 0.97, t0());

        let opened = coordinator.handle(&first, &trends, t0()).unwrap();
        let EscalationOutcome::Opened { request_id, document } = opened else {
            panic!("expected a new request");
        };
        assert!(document.contains(&request_id));

        let later = t0() + Duration::hours(2);
        let merged = coordinator.handle(&second, &trends, later).unwrap();
        assert!(matches!(merged, EscalationOutcome::Merged { .. }));
        assert_eq!(merged.request_id(), request_id);

        let request = coordinator.get(&request_id).unwrap();
        assert_eq!(request.trigger_ids, vec![first.id.clone(), second.id.clone()]);
        assert_eq!(request.urgency, Urgency::Critical);
        assert_eq!(request.deadline, t0() + Duration::hours(24));
        assert_eq!(coordinator.pending_count(), 1);
    }

    #[test]
    fn test_merge_targets_earliest_pending_request() {
        let mut coordinator = EscalationCoordinator::new();
        let trends = TrendReport::default();

        // Two requests end up covering SYSTEM_FAILURE: the second one only
        // after the first one is resolved and a new one opens.
        let a = synthetic(Urgency::High, Category::SystemFailure, "a");
        let first_id = coordinator.handle(&a, &trends, t0()).unwrap().request_id().to_string();
        assert!(coordinator.resolve(&first_id));

        let b = synthetic(Urgency::High, Category::SystemFailure, "b");
        let second_id = coordinator
            .handle(&b, &trends, t0() + Duration::minutes(1))
            .unwrap()
            .request_id()
            .to_string();
        assert_ne!(first_id, second_id);

        let c = synthetic(Urgency::Critical, Category::SystemFailure, "c");
        let outcome = coordinator.handle(&c, &trends, t0() + Duration::minutes(2)).unwrap();
        assert!(matches!(outcome, EscalationOutcome::Merged { .. }));
        assert_eq!(outcome.request_id(), second_id);
    }

    #[test]
    fn test_expired_request_does_not_take_merges_before_sweep() {
        let mut coordinator = EscalationCoordinator::new();
        let trends = TrendReport::default();
        let first = rule_trigger("worker_health_critical", Indicator::WorkerHealthScore, 0.3, t0());
        let first_id = coordinator.handle(&first, &trends, t0()).unwrap().request_id().to_string();

        // Still pending at the exact deadline, so a trigger then merges
        let deadline = t0() + Duration::hours(24);
        let at_deadline = rule_trigger("memory_exhaustion", Indicator::MemoryUsage, 0.97, deadline);
        let outcome = coordinator.handle(&at_deadline, &trends, deadline).unwrap();
        assert_eq!(outcome.request_id(), first_id);

        // Past the deadline the request no longer takes merges, even before a sweep
        let later = deadline + Duration::seconds(30);
        let late = rule_trigger("memory_exhaustion", Indicator::MemoryUsage, 0.99, later);
        let outcome = coordinator.handle(&late, &trends, later).unwrap();
        let EscalationOutcome::Opened { request_id, .. } = outcome else {
            panic!("expected a new request past the deadline");
        };
        assert_ne!(request_id, first_id);
        assert_eq!(coordinator.get(&request_id).unwrap().deadline, later + Duration::hours(24));

        assert_eq!(coordinator.sweep(later), vec![first_id]);
        assert_eq!(coordinator.pending_count(), 1);
        assert_eq!(coordinator.overdue_count(), 1);
    }

    #[test]
    fn test_merge_re_renders_document() {
        let mut coordinator = EscalationCoordinator::new();
        let trends = TrendReport::default();
        let mut first = synthetic(Urgency::High, Category::SystemFailure, "a");
        first.suggested_agenda = vec!["Restart workers".to_string()];
        let id = coordinator.handle(&first, &trends, t0()).unwrap().request_id().to_string();
        assert!(!coordinator.document(&id).unwrap().contains("Drain the queue"));

        let mut second = synthetic(Urgency::Critical, Category::SystemFailure, "b");
        second.id = "trg-second".to_string();
        second.suggested_agenda = vec!["Drain the queue".to_string()];
        let outcome = coordinator.handle(&second, &trends, t0() + Duration::hours(1)).unwrap();

        let document = coordinator.document(&id).unwrap();
        assert_eq!(outcome.document(), document);
        assert!(document.contains("1. Restart workers"));
        assert!(document.contains("2. Drain the queue"));
        assert!(document.contains("- `trg-second`"));
        assert!(document.contains("**a**"));
    }

    #[test]
    fn test_different_category_opens_new_request() {
        let mut coordinator = EscalationCoordinator::new();
        let trends = TrendReport::default();
        let a = synthetic(Urgency::High, Category::SystemFailure, "a");
        let b = synthetic(Urgency::High, Category::StrategicDecision, "b");

        coordinator.handle(&a, &trends, t0());
        let outcome = coordinator.handle(&b, &trends, t0()).unwrap();
        assert!(matches!(outcome, EscalationOutcome::Opened { .. }));
        assert_eq!(coordinator.pending_count(), 2);
    }

    #[test]
    fn test_overdue_request_does_not_take_merges() {
        let mut coordinator = EscalationCoordinator::new();
        let trends = TrendReport::default();
        let a = synthetic(Urgency::Critical, Category::SystemFailure, "a");
        coordinator.handle(&a, &trends, t0());

        let flipped = coordinator.sweep(t0() + Duration::hours(25));
        assert_eq!(flipped.len(), 1);
        assert_eq!(coordinator.overdue_count(), 1);
        assert_eq!(coordinator.pending_count(), 0);

        let b = synthetic(Urgency::Critical, Category::SystemFailure, "b");
        let outcome = coordinator.handle(&b, &trends, t0() + Duration::hours(26)).unwrap();
        assert!(matches!(outcome, EscalationOutcome::Opened { .. }));
    }

    #[test]
    fn test_resolve() {
        let mut coordinator = EscalationCoordinator::new();
        let a = synthetic(Urgency::Critical, Category::SystemFailure, "a");
        let id = coordinator
            .handle(&a, &TrendReport::default(), t0())
            .unwrap()
            .request_id()
            .to_string();

        coordinator.sweep(t0() + Duration::days(2));
        assert!(coordinator.resolve(&id));
        assert!(!coordinator.resolve(&id));
        assert!(!coordinator.resolve("esc-missing"));
        assert_eq!(coordinator.get(&id).unwrap().status, EscalationStatus::Resolved);
        assert!(coordinator.document(&id).is_some());
    }

    #[test]
    fn test_same_second_reopen_gets_distinct_id() {
        let mut coordinator = EscalationCoordinator::new();
        let trends = TrendReport::default();
        let a = synthetic(Urgency::High, Category::SystemFailure, "a");

        let first = coordinator.handle(&a, &trends, t0()).unwrap().request_id().to_string();
        coordinator.resolve(&first);
        let second = coordinator.handle(&a, &trends, t0()).unwrap().request_id().to_string();
        assert_eq!(second, format!("{}-2", first));
    }
}
