//! Collection Error Types

use thiserror::Error;

/// Errors that can occur while reading a snapshot from a metrics source
#[derive(Debug, Clone, Error)]
pub enum CollectionError {
    /// Source did not answer within the collection budget
    #[error("Metrics collection timed out after {0}ms")]
    Timeout(u64),

    /// Source could not be reached or read
    #[error("Metrics source unavailable: {0}")]
    Unavailable(String),

    /// Source answered with a document that is not an indicator object
    #[error("Malformed metrics document: {0}")]
    Malformed(String),
}

impl From<std::io::Error> for CollectionError {
    fn from(err: std::io::Error) -> Self {
        CollectionError::Unavailable(err.to_string())
    }
}
