//! Trend Analyzer Implementation

use health_metrics::{Indicator, MetricSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

/// Points considered per indicator
pub const TREND_WINDOW: usize = 10;

/// Points averaged as "recent"
pub const RECENT_POINTS: usize = 3;

/// Relative change beyond which a series is no longer stable
const CHANGE_THRESHOLD: f64 = 0.10;

/// Direction of an indicator over the recent window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    /// Fewer than two readings
    #[default]
    Unknown,
}

impl Trend {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
            Trend::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trend of every trended indicator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub trends: BTreeMap<Indicator, Trend>,
}

impl TrendReport {
    /// Trend for one indicator (unknown if not analyzed)
    pub fn get(&self, indicator: Indicator) -> Trend {
        self.trends.get(&indicator).copied().unwrap_or_default()
    }

    /// Indicators with a known direction, in indicator order
    pub fn known(&self) -> impl Iterator<Item = (Indicator, Trend)> + '_ {
        self.trends
            .iter()
            .filter(|(_, t)| **t != Trend::Unknown)
            .map(|(i, t)| (*i, *t))
    }
}

/// Classifies indicator series from snapshot history
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendAnalyzer;

impl TrendAnalyzer {
    /// Create a new analyzer
    pub fn new() -> Self {
        Self
    }

    /// Classify a series ordered oldest to newest.
    ///
    /// Only the last [`TREND_WINDOW`] points are used. The recent mean covers
    /// the last [`RECENT_POINTS`]; the older mean covers the rest, or just the
    /// earliest point when the window holds fewer than four.
    pub fn classify(&self, series: &[f64]) -> Trend {
        let window = &series[series.len().saturating_sub(TREND_WINDOW)..];
        if window.len() < 2 {
            return Trend::Unknown;
        }

        let split = window.len().saturating_sub(RECENT_POINTS);
        let recent_avg = mean(&window[split..]);
        let older_avg = if window.len() < RECENT_POINTS + 1 {
            window[0]
        } else {
            mean(&window[..split])
        };

        let change = if older_avg == 0.0 {
            0.0
        } else {
            (recent_avg - older_avg) / older_avg
        };

        trace!(recent_avg, older_avg, change, "Trend computed");

        if change > CHANGE_THRESHOLD {
            Trend::Improving
        } else if change < -CHANGE_THRESHOLD {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    /// Analyze every trended indicator across a history (oldest first).
    ///
    /// Snapshots that did not report an indicator contribute no point to it.
    pub fn analyze<'a, I>(&self, history: I) -> TrendReport
    where
        I: IntoIterator<Item = &'a MetricSnapshot>,
    {
        let mut series: BTreeMap<Indicator, Vec<f64>> = BTreeMap::new();
        for snapshot in history {
            for indicator in Indicator::ALL.iter().filter(|i| i.is_trended()) {
                if let Some(value) = snapshot.get(*indicator) {
                    series.entry(*indicator).or_default().push(value);
                }
            }
        }

        let trends = Indicator::ALL
            .iter()
            .filter(|i| i.is_trended())
            .map(|indicator| {
                let points = series.get(indicator).map(Vec::as_slice).unwrap_or(&[]);
                (*indicator, self.classify(points))
            })
            .collect();

        TrendReport { trends }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    #[test]
    fn test_declining_series() {
        let analyzer = TrendAnalyzer::new();
        assert_eq!(
            analyzer.classify(&[0.9, 0.9, 0.9, 0.5, 0.5, 0.5]),
            Trend::Declining
        );
    }

    #[test]
    fn test_improving_series() {
        let analyzer = TrendAnalyzer::new();
        assert_eq!(
            analyzer.classify(&[0.5, 0.5, 0.5, 0.9, 0.9, 0.9]),
            Trend::Improving
        );
    }

    #[test]
    fn test_short_series() {
        let analyzer = TrendAnalyzer::new();
        assert_eq!(analyzer.classify(&[]), Trend::Unknown);
        assert_eq!(analyzer.classify(&[0.4]), Trend::Unknown);
        // Two points: recent mean 0.75 against the earliest point 0.5
        assert_eq!(analyzer.classify(&[0.5, 1.0]), Trend::Improving);
        // Three points: recent mean 0.6 against the earliest point 0.9
        assert_eq!(analyzer.classify(&[0.9, 0.5, 0.4]), Trend::Declining);
    }

    #[test]
    fn test_zero_baseline_is_stable() {
        let analyzer = TrendAnalyzer::new();
        assert_eq!(analyzer.classify(&[0.0, 0.0, 0.0, 0.7, 0.8, 0.9]), Trend::Stable);
    }

    #[test]
    fn test_only_last_window_counts() {
        let analyzer = TrendAnalyzer::new();
        // Early spike falls outside the 10-point window
        let mut series = vec![100.0; 5];
        series.extend(std::iter::repeat(0.5).take(10));
        assert_eq!(analyzer.classify(&series), Trend::Stable);
    }

    #[test]
    fn test_analyze_skips_unreported_points() {
        let analyzer = TrendAnalyzer::new();
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let history: Vec<MetricSnapshot> = [0.9, 0.9, 0.9, 0.5, 0.5, 0.5]
            .iter()
            .enumerate()
            .map(|(i, v)| {
                MetricSnapshot::empty(start + Duration::minutes(i as i64))
                    .with(Indicator::WorkerHealthScore, *v)
            })
            .collect();

        let report = analyzer.analyze(&history);
        assert_eq!(report.get(Indicator::WorkerHealthScore), Trend::Declining);
        assert_eq!(report.get(Indicator::MemoryUsage), Trend::Unknown);
        assert_eq!(report.get(Indicator::ResourceConflict), Trend::Unknown);
        assert!(!report.trends.contains_key(&Indicator::ResourceConflict));
        assert_eq!(report.known().count(), 1);
    }

    proptest! {
        #[test]
        fn prop_constant_series_is_stable(value in 0.0f64..1000.0, len in 2usize..30) {
            let series = vec![value; len];
            prop_assert_eq!(TrendAnalyzer::new().classify(&series), Trend::Stable);
        }
    }
}
