use codelink_registry::thresholds::MAX_CANDIDATES;

use crate::stages::Selector;
use crate::types::{CandidateMapping, MappingQuery};

/// Selects the top K candidates by confidence, breaking exact confidence
/// ties by lexicographically smaller SBS code so the ranking is fully
/// deterministic across runs.
pub struct RankedCandidateSelector {
    pub k: usize,
}

impl Default for RankedCandidateSelector {
    fn default() -> Self {
        Self { k: MAX_CANDIDATES }
    }
}

impl Selector<MappingQuery, CandidateMapping> for RankedCandidateSelector {
    fn score(&self, candidate: &CandidateMapping) -> f64 {
        candidate.confidence
    }

    fn tie_break(&self, a: &CandidateMapping, b: &CandidateMapping) -> std::cmp::Ordering {
        a.code.cmp(&b.code)
    }

    fn size(&self) -> Option<usize> {
        Some(self.k)
    }
}
