use serde::Serialize;

use crate::candidate_pipeline::HasRequestId;

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// One normalization request from a facility HIS: a facility-local code plus
/// whatever free-text description the submitting system attached.
#[derive(Clone, Debug)]
pub struct MappingQuery {
    pub request_id: String,
    pub facility_id: String,
    /// Arbitrary facility-local code string, e.g. "NEW_LAB_X1".
    pub internal_code: String,
    /// Free-text procedure/diagnosis description. May be noisy or partial.
    pub description: String,
    /// Normalized lexical tokens, populated by the text-prep query hydrator.
    pub tokens: Vec<String>,
}

impl MappingQuery {
    pub fn new(request_id: &str, facility_id: &str, internal_code: &str, description: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            facility_id: facility_id.to_string(),
            internal_code: internal_code.to_string(),
            description: description.to_string(),
            tokens: Vec::new(),
        }
    }
}

impl HasRequestId for MappingQuery {
    fn request_id(&self) -> &str {
        &self.request_id
    }
}

// ---------------------------------------------------------------------------
// Candidate types
// ---------------------------------------------------------------------------

/// A candidate mapping from the facility-local code to a standardized SBS
/// code. Confidence values across candidates are independent scores, not a
/// probability distribution; they need not sum to 1.
#[derive(Clone, Debug, Serialize)]
pub struct CandidateMapping {
    /// Standardized SBS code.
    pub code: String,
    /// Canonical registry description for the code.
    pub description: String,
    /// Match strength in [0, 1].
    pub confidence: f64,
    /// Human-readable explanation of why this candidate was proposed.
    pub rationale: String,

    // Scoring provenance (populated by the pipeline, feeds the rationale)
    /// Raw lexical similarity from the registry scan, before boosts.
    pub lexical_score: f64,
    /// Query tokens that matched the entry's canonical tokens.
    pub matched_terms: Vec<String>,
    /// True when the facility-local code exactly matched a registered alias.
    pub alias_hit: bool,
    /// True when this candidate came from the degraded cached-alias path
    /// rather than the full matcher.
    pub degraded: bool,
}

impl Default for CandidateMapping {
    fn default() -> Self {
        Self {
            code: String::new(),
            description: String::new(),
            confidence: 0.0,
            rationale: String::new(),
            lexical_score: 0.0,
            matched_terms: Vec::new(),
            alias_hit: false,
            degraded: false,
        }
    }
}
