//! API error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use simbridge_reconcile::ReconcileError;
use simbridge_state::StateError;

use crate::handlers::error_response;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or inconsistent submission; nothing was mutated.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The record changed underneath the request.
    #[error("{0}")]
    Conflict(String),

    /// A wait budget ran out; `outstanding` lists what had not converged.
    #[error("timed out after {attempts} attempts waiting for {target} (outstanding: {outstanding:?})")]
    Timeout {
        target: &'static str,
        attempts: u32,
        outstanding: Vec<i64>,
    },

    #[error("orchestrator error: {0}")]
    Gateway(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            ApiError::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<StateError> for ApiError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::JobNotFound(_) => ApiError::NotFound(e.to_string()),
            StateError::Superseded(_) => ApiError::Conflict(e.to_string()),
            StateError::Validation(msg) => ApiError::Validation(msg),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Gateway(e) => ApiError::Gateway(e.to_string()),
            ReconcileError::TimedOut {
                target,
                attempts,
                outstanding,
            } => ApiError::Timeout {
                target,
                attempts,
                outstanding,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(&self.to_string(), self.status()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simbridge_reconcile::GatewayError;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(StateError::JobNotFound(3)).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(StateError::Superseded(3)).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(ReconcileError::Gateway(GatewayError::Unavailable("down".into()))).status(),
            StatusCode::BAD_GATEWAY
        );
        let timeout = ApiError::from(ReconcileError::TimedOut {
            target: "nodes ready",
            attempts: 20,
            outstanding: vec![4],
        });
        assert_eq!(timeout.status(), StatusCode::REQUEST_TIMEOUT);
        assert!(timeout.to_string().contains("[4]"));
    }
}
