//! Trigger Rules
//!
//! Static tiered threshold rules and the evaluator that turns rule breaches
//! into deduplicated triggers.

mod annotations;
mod error;
mod evaluator;
mod rule;
mod trigger;

pub use annotations::{AdvisorOpinion, AdvisoryResult, AutoAnalysis, Impact, RiskLevel};
pub use error::{RuleErrorKind, RuleEvaluationError};
pub use evaluator::{EvaluationReport, TriggerEvaluator, DEDUP_WINDOW_HOURS};
pub use rule::{Category, Condition, ThresholdRule, ThresholdRuleSet, TriggerTemplate, Urgency};
pub use trigger::{trigger_id, SyntheticTrigger, Trigger};
