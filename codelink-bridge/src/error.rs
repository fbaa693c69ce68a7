//! Exchange boundary error types.
//!
//! Every failure mode has a named variant. The distinction that matters
//! operationally: `Validation` never reaches the exchange, `Rejected` is a
//! final answer from the exchange, `Unreachable` is transient and
//! operator-retryable. Nothing here is retried automatically.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Caller-correctable input problem, caught before any wire call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The exchange processed the request and said no. Surfaced verbatim.
    #[error("exchange rejected: {reason}")]
    Rejected { reason: String },

    /// Network failure or timeout reaching the exchange. Transient;
    /// retryable by operator action only.
    #[error("exchange unreachable: {0}")]
    Unreachable(String),

    /// A flagged claim was submitted without operator confirmation.
    #[error("submission requires confirmation: {flagged} item(s) need prior authorization")]
    ConfirmationRequired { flagged: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for exchange operations.
pub type ExchangeResult<T> = Result<T, ExchangeError>;
