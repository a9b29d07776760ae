//! Storage Layer
//!
//! Write-only mirror of engine state. The in-memory registries stay the
//! source of truth; a failed write never changes them.

mod file;
mod memory;
mod sink;

pub use file::FileSink;
pub use memory::MemorySink;
pub use sink::{persist_with_retry, PersistenceSink, RetryPolicy};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Write timed out after {0} ms")]
    Timeout(u64),
    #[error("Record not found: {0}")]
    NotFound(String),
}
