//! Triage classification of normalization events.
//!
//! Every normalization event lands in exactly one disposition bucket,
//! determined solely from the top candidate's confidence and the configured
//! thresholds. Operator overrides are tracked for audit but never
//! reclassify an event.

use std::fmt;

use serde::Serialize;

use codelink_registry::thresholds::{DEFAULT_AUTO_ACCEPT_THRESHOLD, DEFAULT_REVIEW_TRIGGER};

use crate::error::{EngineError, EngineResult};

/// The four-way triage disposition. Closed enum; `NoMatch` if and only if
/// the normalizer returned no candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Disposition {
    AutoAccept,
    ReviewRequired,
    Rejected,
    NoMatch,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::AutoAccept => write!(f, "Auto Accept"),
            Disposition::ReviewRequired => write!(f, "Review Required"),
            Disposition::Rejected => write!(f, "Rejected"),
            Disposition::NoMatch => write!(f, "No Match"),
        }
    }
}

/// Triage thresholds. Configuration, not constants: facilities with
/// higher-quality HIS feeds run a lower review trigger.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct TriageConfig {
    /// Top confidence at or above this auto-accepts the mapping.
    pub auto_accept_threshold: f64,
    /// Top confidence at or above this (but below auto-accept) requires
    /// review; below it the mapping is rejected.
    pub review_trigger: f64,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            auto_accept_threshold: DEFAULT_AUTO_ACCEPT_THRESHOLD,
            review_trigger: DEFAULT_REVIEW_TRIGGER,
        }
    }
}

impl TriageConfig {
    /// Build a config, enforcing `review_trigger <= auto_accept_threshold <= 1`
    /// and non-negative thresholds.
    pub fn validated(auto_accept_threshold: f64, review_trigger: f64) -> EngineResult<Self> {
        if !(0.0..=1.0).contains(&auto_accept_threshold) || !(0.0..=1.0).contains(&review_trigger) {
            return Err(EngineError::Config(format!(
                "thresholds must be within [0, 1]: auto_accept={}, review={}",
                auto_accept_threshold, review_trigger
            )));
        }
        if review_trigger > auto_accept_threshold {
            return Err(EngineError::Config(format!(
                "review_trigger ({}) must not exceed auto_accept_threshold ({})",
                review_trigger, auto_accept_threshold
            )));
        }
        Ok(Self {
            auto_accept_threshold,
            review_trigger,
        })
    }
}

/// Classify a normalization outcome from its top candidate confidence.
/// `None` means the normalizer returned no candidates at all.
pub fn classify(top_confidence: Option<f64>, config: &TriageConfig) -> Disposition {
    match top_confidence {
        None => Disposition::NoMatch,
        Some(c) if c >= config.auto_accept_threshold => Disposition::AutoAccept,
        Some(c) if c >= config.review_trigger => Disposition::ReviewRequired,
        Some(_) => Disposition::Rejected,
    }
}
