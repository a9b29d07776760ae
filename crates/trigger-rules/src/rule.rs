//! Threshold Rules
//!
//! The rule table is static and ordered: tiers run critical to low, and rules
//! keep their declared order within a tier.

use crate::error::RuleErrorKind;
use crate::trigger::trigger_id;
use health_metrics::{Indicator, IndicatorKind, MetricSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Urgency tier of a rule and the triggers it produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Tiers in evaluation order
    pub const TIERS: [Urgency; 4] = [
        Urgency::Critical,
        Urgency::High,
        Urgency::Medium,
        Urgency::Low,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "CRITICAL",
            Urgency::High => "HIGH",
            Urgency::Medium => "MEDIUM",
            Urgency::Low => "LOW",
        }
    }

    /// Whether triggers of this tier go to the escalation coordinator
    pub fn is_escalated(&self) -> bool {
        matches!(self, Urgency::High | Urgency::Critical)
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of situation a trigger reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    SystemFailure,
    PerformanceDegradation,
    StrategicDecision,
    IntegrationChallenge,
    ArchitecturalChange,
    ResourceConflict,
    EvolutionOpportunity,
}

impl Category {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SystemFailure => "SYSTEM_FAILURE",
            Category::PerformanceDegradation => "PERFORMANCE_DEGRADATION",
            Category::StrategicDecision => "STRATEGIC_DECISION",
            Category::IntegrationChallenge => "INTEGRATION_CHALLENGE",
            Category::ArchitecturalChange => "ARCHITECTURAL_CHANGE",
            Category::ResourceConflict => "RESOURCE_CONFLICT",
            Category::EvolutionOpportunity => "EVOLUTION_OPPORTUNITY",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean condition over one snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// value < bound
    Below { indicator: Indicator, bound: f64 },
    /// value > bound
    Above { indicator: Indicator, bound: f64 },
    /// (1 - value) > bound
    ComplementAbove { indicator: Indicator, bound: f64 },
    /// Flag indicator is set
    Flagged { indicator: Indicator },
    /// Every inner condition holds
    All(Vec<Condition>),
}

impl Condition {
    /// Check the condition. Returns the breaching value of the first
    /// indicator involved, or `None` if the condition does not hold.
    pub fn check(&self, snapshot: &MetricSnapshot) -> Result<Option<f64>, RuleErrorKind> {
        match self {
            Condition::Below { indicator, bound } => {
                let value = read(snapshot, *indicator)?;
                Ok((value < *bound).then_some(value))
            }
            Condition::Above { indicator, bound } => {
                let value = read(snapshot, *indicator)?;
                Ok((value > *bound).then_some(value))
            }
            Condition::ComplementAbove { indicator, bound } => {
                let value = read(snapshot, *indicator)?;
                Ok((1.0 - value > *bound).then_some(value))
            }
            Condition::Flagged { indicator } => {
                let value = read(snapshot, *indicator)?;
                Ok((value != 0.0).then_some(value))
            }
            Condition::All(conditions) => {
                let mut first = None;
                for condition in conditions {
                    match condition.check(snapshot)? {
                        Some(value) => {
                            first.get_or_insert(value);
                        }
                        None => return Ok(None),
                    }
                }
                Ok(first)
            }
        }
    }

    /// Primary indicator this condition reads
    pub fn indicator(&self) -> Option<Indicator> {
        match self {
            Condition::Below { indicator, .. }
            | Condition::Above { indicator, .. }
            | Condition::ComplementAbove { indicator, .. }
            | Condition::Flagged { indicator } => Some(*indicator),
            Condition::All(conditions) => conditions.first().and_then(Condition::indicator),
        }
    }
}

/// Read an indicator, validating it against its value domain
fn read(snapshot: &MetricSnapshot, indicator: Indicator) -> Result<f64, RuleErrorKind> {
    let value = snapshot
        .get(indicator)
        .ok_or(RuleErrorKind::MissingIndicator(indicator))?;

    if !value.is_finite() {
        return Err(RuleErrorKind::NonFinite { indicator, value });
    }

    let (min, max) = match indicator.kind() {
        IndicatorKind::Ratio => (0.0, 1.0),
        IndicatorKind::Count | IndicatorKind::Rate => (0.0, f64::MAX),
        IndicatorKind::Flag => return Ok(value),
    };
    if value < min || value > max {
        return Err(RuleErrorKind::OutOfRange {
            indicator,
            value,
            min,
            max,
        });
    }

    Ok(value)
}

/// What a trigger produced by a rule says
#[derive(Debug, Clone)]
pub struct TriggerTemplate {
    pub title: &'static str,
    /// Description parameterized by the breaching value
    pub describe: fn(f64) -> String,
    pub affected_systems: &'static [&'static str],
    pub suggested_agenda: &'static [&'static str],
}

/// One tiered threshold rule
#[derive(Debug, Clone)]
pub struct ThresholdRule {
    /// Rule identity, stable across releases
    pub name: &'static str,
    pub tier: Urgency,
    pub category: Category,
    pub condition: Condition,
    pub template: TriggerTemplate,
}

impl ThresholdRule {
    /// Stable id shared by every trigger this rule produces
    pub fn id(&self) -> String {
        trigger_id(self.tier, self.name)
    }
}

/// Ordered, immutable rule table
#[derive(Debug, Clone)]
pub struct ThresholdRuleSet {
    rules: Vec<ThresholdRule>,
}

impl ThresholdRuleSet {
    /// Build a rule set. Rules are ordered by tier (critical first); the
    /// declared order is kept within each tier.
    pub fn new(mut rules: Vec<ThresholdRule>) -> Self {
        rules.sort_by_key(|r| std::cmp::Reverse(r.tier));
        Self { rules }
    }

    /// Rules in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &ThresholdRule> {
        self.rules.iter()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the set has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Look up a rule by name
    pub fn get(&self, name: &str) -> Option<&ThresholdRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// The canonical rule table only
    pub fn canonical() -> Self {
        Self::new(canonical_rules())
    }

    /// Canonical rules plus the supplemental MEDIUM/LOW rules
    pub fn standard() -> Self {
        let mut rules = canonical_rules();
        rules.extend(supplemental_rules());
        Self::new(rules)
    }
}

impl Default for ThresholdRuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn canonical_rules() -> Vec<ThresholdRule> {
    vec![
        // CRITICAL
        ThresholdRule {
            name: "worker_health_critical",
            tier: Urgency::Critical,
            category: Category::SystemFailure,
            condition: Condition::Below {
                indicator: Indicator::WorkerHealthScore,
                bound: 0.5,
            },
            template: TriggerTemplate {
                title: "Worker health collapse",
                describe: |v| {
                    format!(
                        "Worker health score dropped to {}, below the 50.0% critical floor",
                        percent(v)
                    )
                },
                affected_systems: &["worker_pool", "task_execution"],
                suggested_agenda: &[
                    "Identify failing workers and their common cause",
                    "Decide on restart or failover of the worker pool",
                    "Assign an owner for recovery follow-up",
                ],
            },
        },
        ThresholdRule {
            name: "memory_exhaustion",
            tier: Urgency::Critical,
            category: Category::SystemFailure,
            condition: Condition::Above {
                indicator: Indicator::MemoryUsage,
                bound: 0.95,
            },
            template: TriggerTemplate {
                title: "Memory exhaustion imminent",
                describe: |v| {
                    format!(
                        "Memory usage reached {}, above the 95.0% critical ceiling",
                        percent(v)
                    )
                },
                affected_systems: &["memory", "worker_pool"],
                suggested_agenda: &[
                    "Locate the largest memory consumers",
                    "Decide whether to shed load or add capacity",
                ],
            },
        },
        ThresholdRule {
            name: "queue_backlog_overflow",
            tier: Urgency::Critical,
            category: Category::PerformanceDegradation,
            condition: Condition::Above {
                indicator: Indicator::QueueBacklog,
                bound: 500.0,
            },
            template: TriggerTemplate {
                title: "Task queue backlog overflow",
                describe: |v| format!("Queue backlog reached {:.0} tasks, above the limit of 500", v),
                affected_systems: &["task_queue", "scheduler"],
                suggested_agenda: &[
                    "Review throughput of queue consumers",
                    "Decide on backlog triage or consumer scale-out",
                ],
            },
        },
        // HIGH
        ThresholdRule {
            name: "test_coverage_floor",
            tier: Urgency::High,
            category: Category::StrategicDecision,
            condition: Condition::Below {
                indicator: Indicator::TestCoverage,
                bound: 0.05,
            },
            template: TriggerTemplate {
                title: "Test coverage critically low",
                describe: |v| format!("Test coverage is {}, below the 5.0% floor", percent(v)),
                affected_systems: &["test_suite", "release_pipeline"],
                suggested_agenda: &[
                    "Decide on a coverage recovery plan",
                    "Prioritise tests for the most changed modules",
                    "Agree on a release gate until coverage recovers",
                ],
            },
        },
        ThresholdRule {
            // Fires at HIGH, not CRITICAL
            name: "consensus_breakdown",
            tier: Urgency::High,
            category: Category::IntegrationChallenge,
            condition: Condition::Below {
                indicator: Indicator::ConsensusRate,
                bound: 0.5,
            },
            template: TriggerTemplate {
                title: "Advisor consensus breakdown",
                describe: |v| {
                    format!("Consensus rate fell to {}, below the 50.0% threshold", percent(v))
                },
                affected_systems: &["advisory_panel", "decision_flow"],
                suggested_agenda: &[
                    "Review the decisions where advisors disagreed",
                    "Decide whether integration contracts need revision",
                ],
            },
        },
        ThresholdRule {
            name: "complexity_ceiling",
            tier: Urgency::High,
            category: Category::ArchitecturalChange,
            condition: Condition::Above {
                indicator: Indicator::ComplexityScore,
                bound: 0.8,
            },
            template: TriggerTemplate {
                title: "System complexity above ceiling",
                describe: |v| {
                    format!("Complexity score is {}, above the 80.0% ceiling", percent(v))
                },
                affected_systems: &["architecture", "codebase"],
                suggested_agenda: &[
                    "Identify the modules driving complexity",
                    "Decide on a refactoring or decomposition plan",
                ],
            },
        },
        ThresholdRule {
            name: "resource_conflict_signal",
            tier: Urgency::High,
            category: Category::ResourceConflict,
            condition: Condition::Flagged {
                indicator: Indicator::ResourceConflict,
            },
            template: TriggerTemplate {
                title: "Resource conflict signaled",
                describe: |_| "An external resource conflict has been signaled".to_string(),
                affected_systems: &["resource_allocation"],
                suggested_agenda: &[
                    "Identify the contending consumers",
                    "Decide on allocation priority",
                ],
            },
        },
        // MEDIUM
        ThresholdRule {
            name: "learning_stagnation",
            tier: Urgency::Medium,
            category: Category::EvolutionOpportunity,
            condition: Condition::All(vec![
                Condition::ComplementAbove {
                    indicator: Indicator::LearningVelocity,
                    bound: 0.8,
                },
                Condition::Below {
                    indicator: Indicator::LearningVelocity,
                    bound: 0.5,
                },
            ]),
            template: TriggerTemplate {
                title: "Learning velocity stagnating",
                describe: |v| format!("Learning velocity is {:.2}, leaving room for improvement", v),
                affected_systems: &["learning_pipeline"],
                suggested_agenda: &[
                    "Review recent learning outcomes",
                    "Choose an improvement experiment to run",
                ],
            },
        },
    ]
}

fn supplemental_rules() -> Vec<ThresholdRule> {
    vec![
        ThresholdRule {
            name: "error_rate_elevated",
            tier: Urgency::Medium,
            category: Category::PerformanceDegradation,
            condition: Condition::Above {
                indicator: Indicator::ErrorRate,
                bound: 0.1,
            },
            template: TriggerTemplate {
                title: "Error rate elevated",
                describe: |v| format!("Error rate is {}, above the 10.0% threshold", percent(v)),
                affected_systems: &["task_execution"],
                suggested_agenda: &["Group recent errors by cause", "Pick the top cause to fix"],
            },
        },
        ThresholdRule {
            name: "api_utilization_high",
            tier: Urgency::Low,
            category: Category::ResourceConflict,
            condition: Condition::Above {
                indicator: Indicator::ApiUtilization,
                bound: 0.9,
            },
            template: TriggerTemplate {
                title: "API quota nearly exhausted",
                describe: |v| format!("API utilization is {} of quota", percent(v)),
                affected_systems: &["external_api"],
                suggested_agenda: &["Review API call budget per consumer"],
            },
        },
        ThresholdRule {
            name: "autonomy_success_low",
            tier: Urgency::Low,
            category: Category::EvolutionOpportunity,
            condition: Condition::Below {
                indicator: Indicator::AutonomousSuccessRate,
                bound: 0.5,
            },
            template: TriggerTemplate {
                title: "Autonomous success rate low",
                describe: |v| {
                    format!("Autonomous success rate is {}, below 50.0%", percent(v))
                },
                affected_systems: &["autonomous_agents"],
                suggested_agenda: &["Sample failed autonomous runs for review"],
            },
        },
    ]
}
