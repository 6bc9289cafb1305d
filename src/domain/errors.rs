//! Domain errors for the QA automation engine.

use thiserror::Error;

use super::models::Disposition;

/// Errors that abort a run or indicate broken bookkeeping.
///
/// Per-attempt problems (producer contract violations, device failures,
/// timeouts) are not represented here; the orchestrator turns them into
/// attempt records instead.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Invalid transition for case {case_id} from {from}: {reason}")]
    InvalidTransition {
        case_id: String,
        from: Disposition,
        reason: String,
    },

    #[error("Unknown case: {0}")]
    UnknownCase(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Shorthand for an input error with a formatted message.
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Persistence(err.to_string())
    }
}
