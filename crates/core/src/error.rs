//! Domain error model.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic business failures.
///
/// Store and network failures belong to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (empty name, negative rating, same participant twice).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state edge outside the forward-only transition tables.
    #[error("{document} cannot move from {from} to {to}")]
    IllegalTransition {
        document: String,
        from: &'static str,
        to: &'static str,
    },

    /// A document invariant would break (unfinished job settled, foreign
    /// outcome, generated artifact reset).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The document is no longer in the state the caller expected.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transition(document: impl Into<String>, from: &'static str, to: &'static str) -> Self {
        Self::IllegalTransition {
            document: document.into(),
            from,
            to,
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Caller input was at fault, as opposed to the document's state.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidId(_))
    }
}
