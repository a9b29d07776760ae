//! Static per-category impact and recommendation tables

use trigger_rules::{Category, Impact};

/// Expected impact of a trigger category
pub fn impact_for(category: Category) -> Impact {
    let (immediate, short_term, long_term) = match category {
        Category::SystemFailure => (
            "Task execution is failing or about to fail",
            "Backlog growth and missed commitments while capacity is degraded",
            "Loss of trust in autonomous operation if failures recur",
        ),
        Category::PerformanceDegradation => (
            "Throughput is reduced and latency is rising",
            "Queued work ages and downstream consumers stall",
            "Capacity planning assumptions no longer hold",
        ),
        Category::StrategicDecision => (
            "Changes ship with little verification",
            "Regressions reach production undetected",
            "Codebase becomes expensive to change safely",
        ),
        Category::IntegrationChallenge => (
            "Decisions are made without agreement between advisors",
            "Conflicting changes pile up across subsystems",
            "Integration contracts drift apart",
        ),
        Category::ArchitecturalChange => (
            "New work slows as complexity rises",
            "Defect rate climbs in tightly coupled modules",
            "Architecture requires a costly restructuring",
        ),
        Category::ResourceConflict => (
            "Consumers contend for the same resources",
            "Starved consumers miss their schedules",
            "Allocation policy needs renegotiation",
        ),
        Category::EvolutionOpportunity => (
            "No immediate operational impact",
            "Improvement opportunities go unused",
            "System capability plateaus",
        ),
    };

    Impact {
        immediate: immediate.to_string(),
        short_term: short_term.to_string(),
        long_term: long_term.to_string(),
    }
}

/// Recommended actions for a trigger category
pub fn recommendations_for(category: Category) -> Vec<String> {
    let actions: &[&str] = match category {
        Category::SystemFailure => &[
            "Restart or replace failing workers",
            "Shed non-critical load until health recovers",
            "Capture diagnostics before state is lost",
        ],
        Category::PerformanceDegradation => &[
            "Scale out queue consumers",
            "Profile the slowest stage of the pipeline",
            "Defer low-priority work",
        ],
        Category::StrategicDecision => &[
            "Freeze risky releases until coverage recovers",
            "Add tests for the most frequently changed modules",
        ],
        Category::IntegrationChallenge => &[
            "Review recent decisions where advisors disagreed",
            "Clarify integration contracts between subsystems",
        ],
        Category::ArchitecturalChange => &[
            "Identify the highest-complexity modules",
            "Plan incremental decomposition",
        ],
        Category::ResourceConflict => &[
            "Set explicit priorities between contending consumers",
            "Review quotas and reservations",
        ],
        Category::EvolutionOpportunity => &[
            "Schedule a learning review",
            "Pick one improvement experiment for the next cycle",
        ],
    };
    actions.iter().map(|a| a.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Category; 7] = [
        Category::SystemFailure,
        Category::PerformanceDegradation,
        Category::StrategicDecision,
        Category::IntegrationChallenge,
        Category::ArchitecturalChange,
        Category::ResourceConflict,
        Category::EvolutionOpportunity,
    ];

    #[test]
    fn test_every_category_has_entries() {
        for category in ALL {
            assert!(!impact_for(category).immediate.is_empty());
            assert!(!recommendations_for(category).is_empty());
        }
    }
}
