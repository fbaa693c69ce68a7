use std::sync::Arc;

use async_trait::async_trait;

use codelink_registry::similarity::find_candidates;
use codelink_registry::thresholds::MAX_CANDIDATES;
use codelink_registry::SbsRegistry;

use crate::stages::Source;
use crate::types::{CandidateMapping, MappingQuery};

/// Raw similarity floor for the registry scan. Intentionally lower than the
/// weak-match filter's confidence floor: the scan over-fetches so downstream
/// boosts can rescue borderline candidates before filtering.
const SCAN_THRESHOLD: f64 = 0.01;

/// How many raw matches to pull from the registry before scoring. Wider than
/// the final result size so filtering never starves the selector.
const SCAN_TOP_K: usize = MAX_CANDIDATES * 3;

/// Source that produces `CandidateMapping` items by scanning the SBS
/// registry with the hashed-token similarity engine.
pub struct RegistryMatchSource {
    registry: Arc<SbsRegistry>,
}

impl RegistryMatchSource {
    pub fn new(registry: Arc<SbsRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Source<MappingQuery, CandidateMapping> for RegistryMatchSource {
    fn enable(&self, query: &MappingQuery) -> bool {
        !self.registry.is_empty() && !query.tokens.is_empty()
    }

    async fn get_candidates(&self, query: &MappingQuery) -> Result<Vec<CandidateMapping>, String> {
        let matches = find_candidates(
            &query.tokens,
            &self.registry.entries,
            SCAN_THRESHOLD,
            SCAN_TOP_K,
        );

        Ok(matches
            .into_iter()
            .map(|m| {
                let entry = &self.registry.entries[m.entry_index];
                CandidateMapping {
                    code: entry.code.clone(),
                    description: entry.description.clone(),
                    confidence: m.score,
                    lexical_score: m.score,
                    matched_terms: m.matched_terms,
                    ..CandidateMapping::default()
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codelink_registry::registry::RegistryEntry;

    fn sample_registry() -> Arc<SbsRegistry> {
        Arc::new(SbsRegistry::new(vec![
            RegistryEntry::new(
                "SBS-9021".into(),
                "Respiratory Viral Panel, Multiplex PCR, 3-5 Targets".into(),
                vec!["rapid".into(), "molecular".into()],
            ),
            RegistryEntry::new(
                "SBS-1100".into(),
                "Knee Arthroscopy, Partial Meniscectomy".into(),
                Vec::new(),
            ),
        ]))
    }

    fn tokenized_query(description: &str) -> MappingQuery {
        let mut query = MappingQuery::new("req-1", "fac-1", "NEW_LAB_X1", description);
        query.tokens = codelink_registry::similarity::tokenize(description);
        query
    }

    #[tokio::test]
    async fn source_ranks_related_entry_first() {
        let source = RegistryMatchSource::new(sample_registry());
        let query = tokenized_query("Rapid Molecular PCR respiratory panel");
        let candidates = source.get_candidates(&query).await.unwrap();

        assert!(!candidates.is_empty(), "related entry should produce a candidate");
        assert_eq!(candidates[0].code, "SBS-9021");
        assert!(
            candidates[0].lexical_score > 0.3,
            "related entry should score well, got {}",
            candidates[0].lexical_score
        );
    }

    #[tokio::test]
    async fn source_disabled_without_tokens() {
        let source = RegistryMatchSource::new(sample_registry());
        let query = MappingQuery::new("req-2", "fac-1", "", "");
        assert!(!source.enable(&query));
    }

    #[tokio::test]
    async fn source_disabled_for_empty_registry() {
        let source = RegistryMatchSource::new(Arc::new(SbsRegistry::new(Vec::new())));
        let query = tokenized_query("anything at all");
        assert!(!source.enable(&query));
    }
}
