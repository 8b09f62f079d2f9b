//! Gateway and reconciliation error types.

use thiserror::Error;

/// Result type alias for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result type alias for reconciler operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// A failed call to the downstream orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("orchestrator unavailable: {0}")]
    Unavailable(String),

    #[error("{kind} {id} not found in orchestrator")]
    NotFound { kind: &'static str, id: String },

    #[error("orchestrator rejected request: {0}")]
    Rejected(String),
}

/// Errors surfaced by the [`Reconciler`](crate::Reconciler).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The convergence budget ran out; `outstanding` holds the ids that
    /// had not converged on the last attempt.
    #[error("timed out after {attempts} attempts waiting for {target} (outstanding: {outstanding:?})")]
    TimedOut {
        target: &'static str,
        attempts: u32,
        outstanding: Vec<i64>,
    },
}
