use async_trait::async_trait;

use codelink_registry::similarity::tokenize;

use crate::stages::QueryHydrator;
use crate::types::MappingQuery;

/// Hydrates the query with normalized lexical tokens from both the free-text
/// description and the facility-local code. HIS feeds embed real signal in
/// their local codes ("NEW_LAB_X1" carries "lab"), so both contribute.
pub struct TextPrepQueryHydrator;

#[async_trait]
impl QueryHydrator<MappingQuery> for TextPrepQueryHydrator {
    async fn hydrate(&self, query: &MappingQuery) -> Result<MappingQuery, String> {
        let mut tokens = tokenize(&query.description);
        for t in tokenize(&query.internal_code) {
            if !tokens.contains(&t) {
                tokens.push(t);
            }
        }
        Ok(MappingQuery {
            tokens,
            ..query.clone()
        })
    }

    fn update(&self, query: &mut MappingQuery, hydrated: MappingQuery) {
        query.tokens = hydrated.tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tokens_merge_description_and_code() {
        let hydrator = TextPrepQueryHydrator;
        let query = MappingQuery::new("req-1", "fac-1", "NEW_LAB_X1", "Rapid Molecular PCR panel");
        let hydrated = hydrator.hydrate(&query).await.unwrap();
        assert!(hydrated.tokens.contains(&"pcr".to_string()));
        assert!(hydrated.tokens.contains(&"lab".to_string()));
        // no duplicates when code and description share a token
        let q2 = MappingQuery::new("req-2", "fac-1", "PCR_01", "pcr test");
        let h2 = hydrator.hydrate(&q2).await.unwrap();
        assert_eq!(h2.tokens.iter().filter(|t| *t == "pcr").count(), 1);
    }
}
