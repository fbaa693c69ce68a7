use async_trait::async_trait;

use codelink_registry::thresholds::MIN_CANDIDATE_CONFIDENCE;

use crate::stages::{Filter, FilterResult};
use crate::types::{CandidateMapping, MappingQuery};

/// Filters out candidates below a minimum confidence floor. These are
/// incidental token collisions, not plausible mappings, and surfacing them
/// to operators erodes trust in the ranked list.
pub struct WeakMatchFilter {
    pub min_confidence: f64,
}

impl WeakMatchFilter {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }
}

impl Default for WeakMatchFilter {
    fn default() -> Self {
        Self {
            min_confidence: MIN_CANDIDATE_CONFIDENCE,
        }
    }
}

#[async_trait]
impl Filter<MappingQuery, CandidateMapping> for WeakMatchFilter {
    async fn filter(
        &self,
        _query: &MappingQuery,
        candidates: Vec<CandidateMapping>,
    ) -> Result<FilterResult<CandidateMapping>, String> {
        let (kept, removed): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|c| c.confidence >= self.min_confidence);

        Ok(FilterResult { kept, removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn weak_candidates_are_removed() {
        let filter = WeakMatchFilter::new(0.2);
        let query = MappingQuery::new("req-1", "fac-1", "X", "y");
        let candidates = vec![
            CandidateMapping {
                code: "SBS-0001".into(),
                confidence: 0.6,
                ..CandidateMapping::default()
            },
            CandidateMapping {
                code: "SBS-0002".into(),
                confidence: 0.05,
                ..CandidateMapping::default()
            },
        ];
        let FilterResult { kept, removed } = filter.filter(&query, candidates).await.unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].code, "SBS-0001");
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].code, "SBS-0002");
    }
}
