//! Trend Engine
//!
//! Classifies each indicator as improving, declining or stable by comparing
//! the mean of the most recent readings with the mean of the older ones.

mod analyzer;

pub use analyzer::{Trend, TrendAnalyzer, TrendReport, RECENT_POINTS, TREND_WINDOW};
