//! Trigger Annotations
//!
//! Derived analysis and optional advisory opinions attached to a trigger
//! after it is created.

use crate::rule::Urgency;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk level derived from the number of breached risk factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Map a risk factor count to a level
    pub fn from_factor_count(count: usize) -> Self {
        match count {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            2 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected impact over three horizons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub immediate: String,
    pub short_term: String,
    pub long_term: String,
}

/// Automatic analysis of a trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoAnalysis {
    pub risk_level: RiskLevel,
    /// Names of the breached risk factors
    pub risk_factors: Vec<String>,
    pub impact: Impact,
    pub recommended_actions: Vec<String>,
    pub urgency_justification: String,
}

/// One advisor's opinion on a trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorOpinion {
    pub advisor: String,
    pub assessment: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub recommended_priority: Urgency,
}

/// Opinions gathered from the advisory panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryResult {
    pub opinions: Vec<AdvisorOpinion>,
    /// Mean confidence across opinions
    pub aggregate_confidence: f64,
}

impl AdvisoryResult {
    /// Build a result from opinions, clamping each confidence into [0, 1].
    /// Returns `None` when there are no opinions.
    pub fn from_opinions(mut opinions: Vec<AdvisorOpinion>) -> Option<Self> {
        if opinions.is_empty() {
            return None;
        }
        for opinion in &mut opinions {
            opinion.confidence = if opinion.confidence.is_finite() {
                opinion.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        let aggregate_confidence =
            opinions.iter().map(|o| o.confidence).sum::<f64>() / opinions.len() as f64;
        Some(Self {
            opinions,
            aggregate_confidence,
        })
    }
}
