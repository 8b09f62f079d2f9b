//! Error types for the SimBridge state store.

use thiserror::Error;

use crate::types::JobId;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The job was resubmitted after the revision an outcome was computed for.
    #[error("job {0} was resubmitted")]
    Superseded(JobId),

    #[error("invalid submission: {0}")]
    Validation(String),
}
