//! Engine error types.
//!
//! Every failure mode has a named variant. Matcher unavailability is NOT an
//! error at the engine boundary — the normalizer degrades to the cached
//! heuristic path instead — so there is no variant for it here; the variants
//! below are the failures a caller must actually handle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller-correctable input problem.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Configuration violates an invariant (e.g. threshold ordering).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An operator override referenced an event that does not exist.
    #[error("unknown normalization event: {0}")]
    UnknownEvent(String),

    /// Serialization failure at a JSON boundary.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
