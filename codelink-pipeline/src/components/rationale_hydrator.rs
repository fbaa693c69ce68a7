use async_trait::async_trait;

use crate::stages::Hydrator;
use crate::types::{CandidateMapping, MappingQuery};

/// Hydrates each candidate with a human-readable rationale built from its
/// scoring provenance. Operators reviewing a mapping see why the engine
/// proposed it, not just a bare number.
pub struct RationaleHydrator;

fn build_rationale(candidate: &CandidateMapping) -> String {
    let mut parts: Vec<String> = Vec::new();

    if candidate.matched_terms.is_empty() {
        parts.push("no shared terms with the canonical description".to_string());
    } else {
        parts.push(format!(
            "matched terms: {} (lexical {:.2})",
            candidate.matched_terms.join(", "),
            candidate.lexical_score
        ));
    }
    if candidate.alias_hit {
        parts.push("facility code is a registered alias for this entry".to_string());
    }

    parts.join("; ")
}

#[async_trait]
impl Hydrator<MappingQuery, CandidateMapping> for RationaleHydrator {
    async fn hydrate(
        &self,
        _query: &MappingQuery,
        candidates: &[CandidateMapping],
    ) -> Result<Vec<CandidateMapping>, String> {
        let hydrated = candidates
            .iter()
            .map(|c| CandidateMapping {
                rationale: build_rationale(c),
                ..CandidateMapping::default()
            })
            .collect();
        Ok(hydrated)
    }

    fn update(&self, candidate: &mut CandidateMapping, hydrated: CandidateMapping) {
        candidate.rationale = hydrated.rationale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rationale_names_matched_terms_and_alias() {
        let hydrator = RationaleHydrator;
        let query = MappingQuery::new("req-1", "fac-1", "NEW_LAB_X1", "pcr panel");
        let candidates = vec![CandidateMapping {
            code: "SBS-9021".into(),
            lexical_score: 0.54,
            matched_terms: vec!["pcr".into(), "panel".into()],
            alias_hit: true,
            ..CandidateMapping::default()
        }];
        let hydrated = hydrator.hydrate(&query, &candidates).await.unwrap();
        let rationale = &hydrated[0].rationale;
        assert!(rationale.contains("pcr, panel"), "got: {}", rationale);
        assert!(rationale.contains("registered alias"), "got: {}", rationale);
    }

    #[tokio::test]
    async fn rationale_explains_empty_overlap() {
        let hydrator = RationaleHydrator;
        let query = MappingQuery::new("req-1", "fac-1", "X", "y");
        let candidates = vec![CandidateMapping::default()];
        let hydrated = hydrator.hydrate(&query, &candidates).await.unwrap();
        assert!(hydrated[0].rationale.contains("no shared terms"));
    }
}
