//! Auto Analysis Builder

use crate::tables::{impact_for, recommendations_for};
use health_metrics::{Indicator, MetricSnapshot};
use trend_engine::{Trend, TrendReport};
use trigger_rules::{AutoAnalysis, RiskLevel, Trigger};
use tracing::debug;

/// A condition that raises the risk level when breached
#[derive(Debug, Clone, Copy)]
pub struct RiskFactor {
    pub name: &'static str,
    pub indicator: Indicator,
    pub breached: fn(f64) -> bool,
}

/// Risk factors, each counting once toward the risk level
pub const RISK_FACTORS: [RiskFactor; 4] = [
    RiskFactor {
        name: "worker_health_degraded",
        indicator: Indicator::WorkerHealthScore,
        breached: |v| v < 0.7,
    },
    RiskFactor {
        name: "memory_pressure",
        indicator: Indicator::MemoryUsage,
        breached: |v| v > 0.8,
    },
    RiskFactor {
        name: "error_rate_elevated",
        indicator: Indicator::ErrorRate,
        breached: |v| v > 0.05,
    },
    RiskFactor {
        name: "test_coverage_low",
        indicator: Indicator::TestCoverage,
        breached: |v| v < 0.1,
    },
];

/// Qualitative clauses for the urgency justification
const CLAUSES: [(Indicator, fn(f64) -> bool, &str); 6] = [
    (Indicator::WorkerHealthScore, |v| v < 0.5, "majority of workers are failing"),
    (Indicator::MemoryUsage, |v| v > 0.95, "memory is close to exhaustion"),
    (Indicator::QueueBacklog, |v| v > 500.0, "task backlog exceeds processing capacity"),
    (Indicator::ErrorRate, |v| v > 0.1, "error rate is elevated"),
    (Indicator::TestCoverage, |v| v < 0.05, "test coverage is critically low"),
    (Indicator::ConsensusRate, |v| v < 0.5, "advisors fail to reach consensus"),
];

/// Indicators whose declining trend strengthens the justification
const TREND_CLAUSES: [(Indicator, &str); 2] = [
    (Indicator::WorkerHealthScore, "worker health is declining"),
    (Indicator::TestCoverage, "test coverage is declining"),
];

/// Builds [`AutoAnalysis`] values. Pure: no state, no side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAnalysisBuilder;

impl AutoAnalysisBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self
    }

    /// Names of the risk factors breached by a snapshot.
    /// Indicators the source did not report never count.
    pub fn risk_factors(&self, snapshot: &MetricSnapshot) -> Vec<String> {
        RISK_FACTORS
            .iter()
            .filter(|f| snapshot.get(f.indicator).is_some_and(|v| (f.breached)(v)))
            .map(|f| f.name.to_string())
            .collect()
    }

    /// Derive the full analysis for a trigger
    pub fn build(&self, trigger: &Trigger, trends: &TrendReport) -> AutoAnalysis {
        let risk_factors = self.risk_factors(&trigger.snapshot);
        let risk_level = RiskLevel::from_factor_count(risk_factors.len());
        let urgency_justification = self.justification(trigger, trends);

        debug!(
            "Analysis for {}: risk {} ({} factors)",
            trigger.id,
            risk_level,
            risk_factors.len()
        );

        AutoAnalysis {
            risk_level,
            risk_factors,
            impact: impact_for(trigger.category),
            recommended_actions: recommendations_for(trigger.category),
            urgency_justification,
        }
    }

    fn justification(&self, trigger: &Trigger, trends: &TrendReport) -> String {
        let snapshot = &trigger.snapshot;
        let mut clauses: Vec<&str> = CLAUSES
            .iter()
            .filter(|(indicator, test, _)| snapshot.get(*indicator).is_some_and(|v| test(v)))
            .map(|(_, _, clause)| *clause)
            .collect();

        clauses.extend(
            TREND_CLAUSES
                .iter()
                .filter(|(indicator, _)| trends.get(*indicator) == Trend::Declining)
                .map(|(_, clause)| *clause),
        );

        if clauses.is_empty() {
            format!(
                "{} threshold breach requires review at {} priority",
                trigger.category, trigger.urgency
            )
        } else {
            let mut text = clauses.join("; ");
            if let Some(first) = text.get(..1) {
                text = first.to_uppercase() + &text[1..];
            }
            text
        }
    }
}
