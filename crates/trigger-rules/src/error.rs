//! Rule Evaluation Error Types

use health_metrics::Indicator;
use thiserror::Error;

/// Why a single rule could not be evaluated against a snapshot
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleErrorKind {
    /// Indicator was not reported by the source
    #[error("indicator {0} not reported")]
    MissingIndicator(Indicator),

    /// Indicator holds NaN or infinity
    #[error("indicator {indicator} is not finite ({value})")]
    NonFinite { indicator: Indicator, value: f64 },

    /// Indicator is outside its value domain
    #[error("{indicator} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        indicator: Indicator,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// A rule skipped during evaluation
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Rule {rule} ({rule_id}) skipped: {kind}")]
pub struct RuleEvaluationError {
    /// Rule name
    pub rule: String,
    /// Stable rule id
    pub rule_id: String,
    /// Failure detail
    pub kind: RuleErrorKind,
}

impl RuleEvaluationError {
    /// Whether the failure is only a missing reading
    pub fn is_missing_indicator(&self) -> bool {
        matches!(self.kind, RuleErrorKind::MissingIndicator(_))
    }
}
