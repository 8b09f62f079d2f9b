//! Scheduler error types.

use thiserror::Error;

/// Errors that interrupt scheduling a single job.
///
/// Neither variant aborts a pass: an extender failure leaves the job
/// Pending for the next pass, and a store failure means the job vanished
/// mid-pass.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Extender(#[from] simbridge_extender::ExtenderError),

    #[error("state store error: {0}")]
    State(#[from] simbridge_state::StateError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
