//! Escalation
//!
//! Groups related HIGH/CRITICAL triggers into deadline-bound escalation
//! requests and tracks whether those requests go overdue.
//!
//! ```text
//! pending --(now > deadline)--> overdue
//! pending --(external resolve)--> resolved
//! overdue --(external resolve)--> resolved
//! ```

mod coordinator;
mod deadline;
mod document;
mod request;

pub use coordinator::{EscalationCoordinator, EscalationOutcome};
pub use deadline::DeadlineMonitor;
pub use document::render_document;
pub use request::{deadline_window, EscalationRequest, EscalationStatus};
