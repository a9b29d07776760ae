//! Route handlers

pub mod escalations;
pub mod status;
pub mod triggers;
