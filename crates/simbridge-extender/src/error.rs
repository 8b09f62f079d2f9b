//! Extender error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for extender calls.
pub type ExtenderResult<T> = Result<T, ExtenderError>;

/// Which half of the protocol exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtenderPhase {
    Filter,
    Prioritize,
}

impl ExtenderPhase {
    /// Path segment appended to the extender base URL.
    pub fn path(self) -> &'static str {
        match self {
            ExtenderPhase::Filter => "filter",
            ExtenderPhase::Prioritize => "prioritize",
        }
    }
}

impl std::fmt::Display for ExtenderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// A failed filter or prioritize call.
#[derive(Debug, Error)]
#[error("extender {phase} call failed: {cause}")]
pub struct ExtenderError {
    pub phase: ExtenderPhase,
    #[source]
    pub cause: ExtenderCause,
}

impl ExtenderError {
    pub fn new(phase: ExtenderPhase, cause: ExtenderCause) -> Self {
        Self { phase, cause }
    }
}

/// The underlying reason an extender call failed.
#[derive(Debug, Error)]
pub enum ExtenderCause {
    #[error("invalid extender url: {0}")]
    InvalidUrl(String),

    #[error("failed to encode extender args: {0}")]
    Encode(serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("extender returned non-success status {0}")]
    Status(u16),

    #[error("failed to decode extender response: {0}")]
    Decode(serde_json::Error),

    /// Raised by non-HTTP extenders (scripted test doubles, in-process scorers).
    #[error("{0}")]
    Other(String),
}
