//! Monitor
//!
//! Owns the engine state and drives it on a fixed interval. All registries
//! live in [`MonitorEngine`], which is only mutated behind the [`Monitor`]'s
//! lock; collection and persistence happen outside it.

mod config;
mod engine;
mod error;
mod monitor;
mod scheduler;
mod status;

pub use config::EngineConfig;
pub use engine::{MonitorEngine, Processed};
pub use error::{ConfigError, CycleError};
pub use monitor::Monitor;
pub use scheduler::MonitoringLoop;
pub use status::{CycleReport, DegradedStep, SystemStatus};
