use std::sync::Arc;

use async_trait::async_trait;

use codelink_registry::thresholds::ALIAS_EXACT_BOOST;
use codelink_registry::SbsRegistry;

use crate::stages::Scorer;
use crate::types::{CandidateMapping, MappingQuery};

/// Finalizes each candidate's confidence from its raw lexical score, adding
/// a fixed boost when the facility-local code is a registered alias of the
/// candidate's entry. An exact alias hit is the strongest signal a facility
/// mapping can carry, so it can lift a borderline lexical match into the
/// auto-accept band.
pub struct AliasBoostScorer {
    registry: Arc<SbsRegistry>,
}

impl AliasBoostScorer {
    pub fn new(registry: Arc<SbsRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Scorer<MappingQuery, CandidateMapping> for AliasBoostScorer {
    async fn score(
        &self,
        query: &MappingQuery,
        candidates: &[CandidateMapping],
    ) -> Result<Vec<CandidateMapping>, String> {
        let alias_target = self
            .registry
            .lookup_alias(&query.internal_code)
            .map(|entry| entry.code.clone());

        let scored = candidates
            .iter()
            .map(|c| {
                let alias_hit = alias_target.as_deref() == Some(c.code.as_str());
                let boost = if alias_hit { ALIAS_EXACT_BOOST } else { 0.0 };
                CandidateMapping {
                    confidence: (c.lexical_score + boost).clamp(0.0, 1.0),
                    alias_hit,
                    ..CandidateMapping::default()
                }
            })
            .collect();

        Ok(scored)
    }

    fn update(&self, candidate: &mut CandidateMapping, scored: CandidateMapping) {
        candidate.confidence = scored.confidence;
        candidate.alias_hit = scored.alias_hit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codelink_registry::registry::RegistryEntry;

    fn registry_with_alias() -> Arc<SbsRegistry> {
        Arc::new(SbsRegistry::new(vec![RegistryEntry::new(
            "SBS-9021".into(),
            "Respiratory Viral Panel, Multiplex PCR".into(),
            Vec::new(),
        )
        .with_aliases(vec!["NEW_LAB_X1".into()])]))
    }

    #[tokio::test]
    async fn alias_hit_boosts_confidence() {
        let scorer = AliasBoostScorer::new(registry_with_alias());
        let query = MappingQuery::new("req-1", "fac-1", "NEW_LAB_X1", "pcr panel");
        let candidates = vec![CandidateMapping {
            code: "SBS-9021".into(),
            lexical_score: 0.7,
            ..CandidateMapping::default()
        }];
        let scored = scorer.score(&query, &candidates).await.unwrap();
        assert!(scored[0].alias_hit);
        assert!(
            (scored[0].confidence - 0.85).abs() < 1e-9,
            "0.7 + 0.15 boost expected, got {}",
            scored[0].confidence
        );
    }

    #[tokio::test]
    async fn confidence_is_clamped_to_one() {
        let scorer = AliasBoostScorer::new(registry_with_alias());
        let query = MappingQuery::new("req-1", "fac-1", "NEW_LAB_X1", "pcr panel");
        let candidates = vec![CandidateMapping {
            code: "SBS-9021".into(),
            lexical_score: 0.95,
            ..CandidateMapping::default()
        }];
        let scored = scorer.score(&query, &candidates).await.unwrap();
        assert!(scored[0].confidence <= 1.0);
    }

    #[tokio::test]
    async fn unrelated_code_gets_no_boost() {
        let scorer = AliasBoostScorer::new(registry_with_alias());
        let query = MappingQuery::new("req-1", "fac-1", "SOMETHING_ELSE", "pcr panel");
        let candidates = vec![CandidateMapping {
            code: "SBS-9021".into(),
            lexical_score: 0.7,
            ..CandidateMapping::default()
        }];
        let scored = scorer.score(&query, &candidates).await.unwrap();
        assert!(!scored[0].alias_hit);
        assert!((scored[0].confidence - 0.7).abs() < 1e-9);
    }
}
