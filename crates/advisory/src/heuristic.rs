//! Built-in heuristic advisors
//!
//! Four fixed perspectives, each reading a single signal from the trigger's
//! snapshot. Opinions from these advisors are annotations only.

use crate::panel::Advisor;
use crate::AdvisoryError;
use health_metrics::Indicator;
use serde::{Deserialize, Serialize};
use trigger_rules::{AdvisorOpinion, Category, Trigger, Urgency};

/// Viewpoint of a heuristic advisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    Reliability,
    Performance,
    Quality,
    Strategy,
}

impl Perspective {
    /// Every perspective
    pub const ALL: [Perspective; 4] = [
        Perspective::Reliability,
        Perspective::Performance,
        Perspective::Quality,
        Perspective::Strategy,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Perspective::Reliability => "reliability",
            Perspective::Performance => "performance",
            Perspective::Quality => "quality",
            Perspective::Strategy => "strategy",
        }
    }

    /// Categories this perspective has an opinion on
    fn covers(&self, category: Category) -> bool {
        match self {
            Perspective::Reliability => matches!(
                category,
                Category::SystemFailure | Category::ResourceConflict
            ),
            Perspective::Performance => matches!(
                category,
                Category::PerformanceDegradation | Category::ResourceConflict | Category::SystemFailure
            ),
            Perspective::Quality => matches!(
                category,
                Category::StrategicDecision | Category::ArchitecturalChange
            ),
            Perspective::Strategy => matches!(
                category,
                Category::StrategicDecision
                    | Category::IntegrationChallenge
                    | Category::EvolutionOpportunity
                    | Category::ArchitecturalChange
            ),
        }
    }

    /// Signal this perspective weighs, mapped to a severity in [0, 1]
    fn severity(&self, trigger: &Trigger) -> Option<f64> {
        let snapshot = &trigger.snapshot;
        match self {
            Perspective::Reliability => snapshot
                .get(Indicator::WorkerHealthScore)
                .map(|v| 1.0 - v),
            Perspective::Performance => snapshot
                .get(Indicator::QueueBacklog)
                .map(|v| (v / 1000.0).min(1.0))
                .or_else(|| snapshot.get(Indicator::CpuUsage)),
            Perspective::Quality => snapshot.get(Indicator::TestCoverage).map(|v| 1.0 - v),
            Perspective::Strategy => snapshot.get(Indicator::ConsensusRate).map(|v| 1.0 - v),
        }
    }
}

/// Advisor that judges a trigger from one fixed perspective
#[derive(Debug, Clone, Copy)]
pub struct HeuristicAdvisor {
    perspective: Perspective,
}

impl HeuristicAdvisor {
    /// Create an advisor for a perspective
    pub fn new(perspective: Perspective) -> Self {
        Self { perspective }
    }

    /// One advisor per perspective
    pub fn all() -> Vec<Box<dyn Advisor>> {
        Perspective::ALL
            .iter()
            .map(|p| Box::new(HeuristicAdvisor::new(*p)) as Box<dyn Advisor>)
            .collect()
    }
}

impl Advisor for HeuristicAdvisor {
    fn name(&self) -> &str {
        self.perspective.as_str()
    }

    fn assess(&self, trigger: &Trigger) -> Result<Option<AdvisorOpinion>, AdvisoryError> {
        if !self.perspective.covers(trigger.category) {
            return Ok(None);
        }

        let severity = self.perspective.severity(trigger);
        let (assessment, confidence, priority) = match severity {
            Some(s) if s >= 0.9 => (
                format!("{} view: severe, act before the deadline", self.perspective.as_str()),
                0.9,
                Urgency::Critical,
            ),
            Some(s) if s >= 0.5 => (
                format!("{} view: significant, keep current priority", self.perspective.as_str()),
                0.7,
                trigger.urgency,
            ),
            Some(_) => (
                format!("{} view: contained, monitor", self.perspective.as_str()),
                0.6,
                trigger.urgency,
            ),
            None => (
                format!("{} view: no supporting signal reported", self.perspective.as_str()),
                0.3,
                trigger.urgency,
            ),
        };

        Ok(Some(AdvisorOpinion {
            advisor: self.perspective.as_str().to_string(),
            assessment,
            confidence,
            recommended_priority: priority,
        }))
    }
}
