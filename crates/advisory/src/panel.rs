//! Advisory Panel Implementation

use crate::AdvisoryError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, warn};
use trigger_rules::{AdvisorOpinion, AdvisoryResult, Trigger};

/// A single advisory capability
pub trait Advisor: Send + Sync {
    /// Advisor name, recorded on its opinions
    fn name(&self) -> &str;

    /// Assess a trigger. `Ok(None)` means the advisor abstains.
    fn assess(&self, trigger: &Trigger) -> Result<Option<AdvisorOpinion>, AdvisoryError>;
}

/// Registered advisors, consulted in registration order
pub struct AdvisoryPanel {
    advisors: Vec<Box<dyn Advisor>>,
    enabled: bool,
}

impl AdvisoryPanel {
    /// Create an enabled panel with no advisors
    pub fn new() -> Self {
        Self {
            advisors: Vec::new(),
            enabled: true,
        }
    }

    /// Create a panel that is never consulted
    pub fn disabled() -> Self {
        Self {
            advisors: Vec::new(),
            enabled: false,
        }
    }

    /// Register an advisor
    pub fn register(&mut self, advisor: Box<dyn Advisor>) {
        info!("Registering advisor: {}", advisor.name());
        self.advisors.push(advisor);
    }

    /// Builder-style registration
    pub fn with(mut self, advisor: Box<dyn Advisor>) -> Self {
        self.register(advisor);
        self
    }

    /// Whether the panel will be consulted
    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.advisors.is_empty()
    }

    /// Number of registered advisors
    pub fn len(&self) -> usize {
        self.advisors.len()
    }

    /// Check if no advisors are registered
    pub fn is_empty(&self) -> bool {
        self.advisors.is_empty()
    }

    /// Gather opinions on a trigger.
    ///
    /// An advisor that errors or panics counts as abstaining. Returns `None`
    /// when the panel is disabled or nobody offered an opinion.
    pub fn consult(&self, trigger: &Trigger) -> Option<AdvisoryResult> {
        if !self.is_enabled() {
            return None;
        }

        let mut opinions = Vec::with_capacity(self.advisors.len());
        for advisor in &self.advisors {
            match catch_unwind(AssertUnwindSafe(|| advisor.assess(trigger))) {
                Ok(Ok(Some(opinion))) => opinions.push(opinion),
                Ok(Ok(None)) => debug!("Advisor {} abstained on {}", advisor.name(), trigger.id),
                Ok(Err(e)) => warn!("Advisor {} failed on {}: {}", advisor.name(), trigger.id, e),
                Err(_) => warn!("Advisor {} panicked on {}", advisor.name(), trigger.id),
            }
        }

        AdvisoryResult::from_opinions(opinions)
    }
}

impl Default for AdvisoryPanel {
    fn default() -> Self {
        Self::new()
    }
}
