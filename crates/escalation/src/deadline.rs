//! Deadline Monitor

use crate::request::{EscalationRequest, EscalationStatus};
use chrono::{DateTime, Utc};
use tracing::warn;

/// Flips pending requests past their deadline to overdue
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlineMonitor;

impl DeadlineMonitor {
    pub fn new() -> Self {
        Self
    }

    /// Mark every pending request with `now > deadline` as overdue.
    /// Returns the ids that changed in this sweep.
    pub fn sweep(&self, requests: &mut [EscalationRequest], now: DateTime<Utc>) -> Vec<String> {
        let mut flipped = Vec::new();
        for request in requests.iter_mut() {
            if request.is_pending() && request.is_past_deadline(now) {
                request.status = EscalationStatus::Overdue;
                warn!(
                    "Escalation {} ({}) is overdue, deadline was {}",
                    request.id, request.urgency, request.deadline
                );
                flipped.push(request.id.clone());
            }
        }
        flipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use health_metrics::{Indicator, MetricSnapshot};
    use trigger_rules::{ThresholdRuleSet, Trigger};

    fn critical_request(now: DateTime<Utc>) -> EscalationRequest {
        let rules = ThresholdRuleSet::canonical();
        let rule = rules.get("memory_exhaustion").unwrap();
        let snapshot = MetricSnapshot::empty(now).with(Indicator::MemoryUsage, 0.99);
        EscalationRequest::open(&Trigger::from_rule(rule, &snapshot, 0.99), now)
    }

    #[test]
    fn test_overdue_after_one_sweep_past_deadline() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        let mut requests = vec![critical_request(t0)];
        let monitor = DeadlineMonitor::new();

        // Exactly at the deadline is still on time
        assert!(monitor.sweep(&mut requests, t0 + Duration::hours(24)).is_empty());
        assert_eq!(requests[0].status, EscalationStatus::Pending);

        let flipped = monitor.sweep(&mut requests, t0 + Duration::hours(24) + Duration::seconds(1));
        assert_eq!(flipped, vec![requests[0].id.clone()]);
        assert_eq!(requests[0].status, EscalationStatus::Overdue);
    }

    #[test]
    fn test_overdue_is_sticky() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        let mut requests = vec![critical_request(t0)];
        let monitor = DeadlineMonitor::new();

        monitor.sweep(&mut requests, t0 + Duration::days(2));
        // A later sweep reports nothing new and a clock going backwards reverts nothing
        assert!(monitor.sweep(&mut requests, t0 + Duration::days(3)).is_empty());
        assert!(monitor.sweep(&mut requests, t0).is_empty());
        assert_eq!(requests[0].status, EscalationStatus::Overdue);
    }

    #[test]
    fn test_resolved_requests_are_ignored() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        let mut requests = vec![critical_request(t0)];
        requests[0].status = EscalationStatus::Resolved;

        assert!(DeadlineMonitor::new()
            .sweep(&mut requests, t0 + Duration::days(5))
            .is_empty());
        assert_eq!(requests[0].status, EscalationStatus::Resolved);
    }
}
