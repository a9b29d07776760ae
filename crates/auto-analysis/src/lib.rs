//! Auto Analysis
//!
//! Derives risk level, impact and recommended actions for a trigger from
//! its snapshot, the current trend report and static per-category tables.

mod builder;
mod tables;

pub use builder::{AutoAnalysisBuilder, RiskFactor, RISK_FACTORS};
pub use tables::{impact_for, recommendations_for};
