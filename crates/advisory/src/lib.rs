//! Advisory Panel
//!
//! Independent advisors may annotate a trigger with a qualitative opinion.
//! Opinions are recorded and surfaced only; they never change a trigger's
//! urgency or block escalation.

mod heuristic;
mod panel;

pub use heuristic::{HeuristicAdvisor, Perspective};
pub use panel::{Advisor, AdvisoryPanel};

use thiserror::Error;

/// Errors raised by an advisor
#[derive(Debug, Clone, Error)]
pub enum AdvisoryError {
    #[error("Advisor unavailable: {0}")]
    Unavailable(String),
}
