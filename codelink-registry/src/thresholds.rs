//! Centralized decision thresholds for code normalization and triage.
//!
//! These values were calibrated against operational mapping data from the
//! pilot facilities. Changing a threshold here affects BOTH candidate ranking
//! (in `similarity.rs`) and triage classification (in
//! `codelink-pipeline/triage.rs`).

/// Top-candidate confidence at or above which a mapping is auto-accepted.
pub const DEFAULT_AUTO_ACCEPT_THRESHOLD: f64 = 0.8;

/// Top-candidate confidence at or above which (but below auto-accept) a
/// mapping is queued for human review. Below this the mapping is rejected.
pub const DEFAULT_REVIEW_TRIGGER: f64 = 0.5;

/// Minimum confidence for a candidate to survive the weak-match filter.
/// Candidates below this are lexical noise, not plausible mappings.
pub const MIN_CANDIDATE_CONFIDENCE: f64 = 0.05;

/// Confidence assigned to the single cached-alias candidate returned when
/// the matcher is unavailable and the engine degrades to heuristic matching.
pub const FALLBACK_CONFIDENCE: f64 = 0.35;

/// Maximum number of ranked candidates returned per normalization request.
pub const MAX_CANDIDATES: usize = 5;

/// Dimensionality of the hashed token vectors. Must be consistent between
/// registry entry encoding and query encoding or cosine scores are garbage.
pub const VECTOR_DIMENSIONS: usize = 1024;

/// Weight of hashed-vector cosine similarity in the blended confidence.
pub const COSINE_WEIGHT: f64 = 0.6;

/// Weight of exact token-overlap coefficient in the blended confidence.
pub const OVERLAP_WEIGHT: f64 = 0.4;

/// Confidence boost when the facility-local code exactly matches a
/// registered alias for the candidate entry.
pub const ALIAS_EXACT_BOOST: f64 = 0.15;
