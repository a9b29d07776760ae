//! Metric Snapshot
//!
//! One timestamped reading of every tracked health indicator. Indicators the
//! source did not report stay absent; consumers that need a number read the
//! neutral default through [`MetricSnapshot::value_or_default`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Value domain of an indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    /// Fraction in [0, 1]
    Ratio,
    /// Non-negative integer count
    Count,
    /// Non-negative float rate
    Rate,
    /// Boolean signal, read as 1.0 / 0.0
    Flag,
}

/// A tracked health indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    WorkerHealthScore,
    MemoryUsage,
    CpuUsage,
    ErrorRate,
    TestCoverage,
    ApiUtilization,
    ConsensusRate,
    ComplexityScore,
    AutonomousSuccessRate,
    QueueBacklog,
    LearningVelocity,
    ResourceConflict,
}

impl Indicator {
    /// Every indicator, in snapshot field order
    pub const ALL: [Indicator; 12] = [
        Indicator::WorkerHealthScore,
        Indicator::MemoryUsage,
        Indicator::CpuUsage,
        Indicator::ErrorRate,
        Indicator::TestCoverage,
        Indicator::ApiUtilization,
        Indicator::ConsensusRate,
        Indicator::ComplexityScore,
        Indicator::AutonomousSuccessRate,
        Indicator::QueueBacklog,
        Indicator::LearningVelocity,
        Indicator::ResourceConflict,
    ];

    /// Field name used in snapshot documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::WorkerHealthScore => "worker_health_score",
            Indicator::MemoryUsage => "memory_usage",
            Indicator::CpuUsage => "cpu_usage",
            Indicator::ErrorRate => "error_rate",
            Indicator::TestCoverage => "test_coverage",
            Indicator::ApiUtilization => "api_utilization",
            Indicator::ConsensusRate => "consensus_rate",
            Indicator::ComplexityScore => "complexity_score",
            Indicator::AutonomousSuccessRate => "autonomous_success_rate",
            Indicator::QueueBacklog => "queue_backlog",
            Indicator::LearningVelocity => "learning_velocity",
            Indicator::ResourceConflict => "resource_conflict",
        }
    }

    /// Value domain of this indicator
    pub fn kind(&self) -> IndicatorKind {
        match self {
            Indicator::QueueBacklog => IndicatorKind::Count,
            Indicator::LearningVelocity => IndicatorKind::Rate,
            Indicator::ResourceConflict => IndicatorKind::Flag,
            _ => IndicatorKind::Ratio,
        }
    }

    /// Whether a trend over this indicator is meaningful
    pub fn is_trended(&self) -> bool {
        self.kind() != IndicatorKind::Flag
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timestamped reading of all tracked health indicators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_health_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_coverage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_utilization: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomous_success_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_backlog: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_velocity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_conflict: Option<bool>,
}

impl MetricSnapshot {
    /// Create a snapshot with no indicators reported
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            worker_health_score: None,
            memory_usage: None,
            cpu_usage: None,
            error_rate: None,
            test_coverage: None,
            api_utilization: None,
            consensus_rate: None,
            complexity_score: None,
            autonomous_success_rate: None,
            queue_backlog: None,
            learning_velocity: None,
            resource_conflict: None,
        }
    }

    /// Builder-style setter
    pub fn with(mut self, indicator: Indicator, value: f64) -> Self {
        self.set(indicator, value);
        self
    }

    /// Record a reading for an indicator
    pub fn set(&mut self, indicator: Indicator, value: f64) {
        match indicator {
            Indicator::WorkerHealthScore => self.worker_health_score = Some(value),
            Indicator::MemoryUsage => self.memory_usage = Some(value),
            Indicator::CpuUsage => self.cpu_usage = Some(value),
            Indicator::ErrorRate => self.error_rate = Some(value),
            Indicator::TestCoverage => self.test_coverage = Some(value),
            Indicator::ApiUtilization => self.api_utilization = Some(value),
            Indicator::ConsensusRate => self.consensus_rate = Some(value),
            Indicator::ComplexityScore => self.complexity_score = Some(value),
            Indicator::AutonomousSuccessRate => self.autonomous_success_rate = Some(value),
            Indicator::QueueBacklog => {
                // Counts cannot go negative; NaN saturates to 0
                self.queue_backlog = Some(value.max(0.0).round() as u64)
            }
            Indicator::LearningVelocity => self.learning_velocity = Some(value),
            Indicator::ResourceConflict => self.resource_conflict = Some(value != 0.0),
        }
    }

    /// Reported value of an indicator, if any
    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        match indicator {
            Indicator::WorkerHealthScore => self.worker_health_score,
            Indicator::MemoryUsage => self.memory_usage,
            Indicator::CpuUsage => self.cpu_usage,
            Indicator::ErrorRate => self.error_rate,
            Indicator::TestCoverage => self.test_coverage,
            Indicator::ApiUtilization => self.api_utilization,
            Indicator::ConsensusRate => self.consensus_rate,
            Indicator::ComplexityScore => self.complexity_score,
            Indicator::AutonomousSuccessRate => self.autonomous_success_rate,
            Indicator::QueueBacklog => self.queue_backlog.map(|v| v as f64),
            Indicator::LearningVelocity => self.learning_velocity,
            Indicator::ResourceConflict => {
                self.resource_conflict.map(|v| if v { 1.0 } else { 0.0 })
            }
        }
    }

    /// Reported value, or the neutral default (0) when absent
    pub fn value_or_default(&self, indicator: Indicator) -> f64 {
        self.get(indicator).unwrap_or(0.0)
    }

    /// Number of indicators present in this snapshot
    pub fn reported_count(&self) -> usize {
        Indicator::ALL.iter().filter(|i| self.get(**i).is_some()).count()
    }

    /// Build a snapshot from a loosely-typed JSON object.
    ///
    /// Unknown keys are ignored. A known key holding the wrong JSON type is
    /// dropped with a warning instead of failing the whole document. A
    /// `timestamp` key, when present and valid RFC 3339, overrides `fallback_ts`.
    pub fn from_json(value: &Value, fallback_ts: DateTime<Utc>) -> Option<Self> {
        let object = value.as_object()?;

        let timestamp = object
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or(fallback_ts);

        let mut snapshot = Self::empty(timestamp);
        for indicator in Indicator::ALL {
            let Some(raw) = object.get(indicator.as_str()) else {
                continue;
            };
            let parsed = match (indicator.kind(), raw) {
                (IndicatorKind::Flag, Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
                (IndicatorKind::Flag, _) => None,
                (_, Value::Number(n)) => n.as_f64(),
                _ => None,
            };
            match parsed {
                Some(v) => snapshot.set(indicator, v),
                None if raw.is_null() => {}
                None => warn!(
                    "Ignoring mistyped indicator {}: {}",
                    indicator.as_str(),
                    raw
                ),
            }
        }

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_absent_indicator_reads_as_default() {
        let snapshot = MetricSnapshot::empty(ts()).with(Indicator::MemoryUsage, 0.4);

        assert_eq!(snapshot.get(Indicator::MemoryUsage), Some(0.4));
        assert_eq!(snapshot.get(Indicator::WorkerHealthScore), None);
        assert_eq!(snapshot.value_or_default(Indicator::WorkerHealthScore), 0.0);
        assert_eq!(snapshot.reported_count(), 1);
    }

    #[test]
    fn test_queue_backlog_is_non_negative_count() {
        let snapshot = MetricSnapshot::empty(ts())
            .with(Indicator::QueueBacklog, -4.0)
            .with(Indicator::ResourceConflict, 1.0);

        assert_eq!(snapshot.queue_backlog, Some(0));
        assert_eq!(snapshot.resource_conflict, Some(true));
    }

    #[test]
    fn test_lenient_json_drops_mistyped_fields() {
        let doc = json!({
            "worker_health_score": 0.3,
            "memory_usage": "high",
            "queue_backlog": 10,
            "resource_conflict": true,
            "unrelated": [1, 2, 3]
        });

        let snapshot = MetricSnapshot::from_json(&doc, ts()).unwrap();
        assert_eq!(snapshot.worker_health_score, Some(0.3));
        assert_eq!(snapshot.memory_usage, None);
        assert_eq!(snapshot.queue_backlog, Some(10));
        assert_eq!(snapshot.resource_conflict, Some(true));
        assert_eq!(snapshot.timestamp, ts());
    }

    #[test]
    fn test_json_timestamp_overrides_fallback() {
        let doc = json!({ "timestamp": "2026-03-02T08:30:00Z", "test_coverage": 0.01 });
        let snapshot = MetricSnapshot::from_json(&doc, ts()).unwrap();
        assert_eq!(snapshot.timestamp.to_rfc3339(), "2026-03-02T08:30:00+00:00");
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(MetricSnapshot::from_json(&json!([0.1, 0.2]), ts()).is_none());
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let snapshot = MetricSnapshot::empty(ts()).with(Indicator::ErrorRate, 0.02);
        let encoded = serde_json::to_value(&snapshot).unwrap();
        let object = encoded.as_object().unwrap();

        assert_eq!(object.len(), 2);
        assert!(object.contains_key("timestamp"));
        assert!(!object.contains_key("memory_usage"));

        let decoded: MetricSnapshot = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, snapshot);
    }
}
