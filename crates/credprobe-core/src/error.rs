//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
///
/// Verification itself never fails with these; probe problems are reported
/// as [`CheckOutcome`](crate::CheckOutcome) values instead.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Provider table is unusable.
    #[error("Invalid provider table: {0}")]
    Provider(String),

    /// No batch job with this id.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A batch job with this id already exists.
    #[error("Duplicate job id: {0}")]
    DuplicateJob(String),

    /// A check record with this id already exists.
    #[error("Duplicate record id: {0}")]
    DuplicateRecord(u64),

    /// A batch was submitted without items.
    #[error("Batch contains no items")]
    EmptyBatch,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
