//! The candidate pipeline orchestrator.
//!
//! A pipeline wires concrete stage implementations together; `execute` drives
//! them in a fixed order: query hydration → sources → scorers → filters →
//! candidate hydration → selection → side effects. Any stage returning an
//! error is logged and skipped rather than failing the request — a mapping
//! request must always come back with whatever candidates survived.

use std::sync::Arc;

use async_trait::async_trait;

use crate::stages::{
    Filter, Hydrator, QueryHydrator, Scorer, Selector, SideEffect, SideEffectInput,
};
use crate::stages::Source;

/// Queries must expose a request id so every stage log line can be
/// correlated back to the originating normalization call.
pub trait HasRequestId {
    fn request_id(&self) -> &str;
}

/// Everything the pipeline observed while processing one query. The caller
/// gets the selected candidates plus the full audit trail of what was
/// retrieved and what the filters removed.
pub struct PipelineResult<Q, C> {
    pub query: Q,
    pub retrieved_candidates: Vec<C>,
    pub filtered_candidates: Vec<C>,
    pub selected_candidates: Vec<C>,
}

/// A complete candidate pipeline. Implementors provide the concrete stages;
/// the default `execute` provides the orchestration.
#[async_trait]
pub trait CandidatePipeline<Q, C>: Send + Sync
where
    Q: Clone + Send + Sync + HasRequestId + 'static,
    C: Clone + Send + Sync + 'static,
{
    fn query_hydrators(&self) -> &[Box<dyn QueryHydrator<Q>>];
    fn sources(&self) -> &[Box<dyn Source<Q, C>>];
    fn hydrators(&self) -> &[Box<dyn Hydrator<Q, C>>];
    fn filters(&self) -> &[Box<dyn Filter<Q, C>>];
    fn scorers(&self) -> &[Box<dyn Scorer<Q, C>>];
    fn selector(&self) -> &dyn Selector<Q, C>;
    fn side_effects(&self) -> Arc<Vec<Box<dyn SideEffect<Q, C>>>>;

    /// Maximum number of candidates in the final result.
    fn result_size(&self) -> usize;

    /// Run the full pipeline for one query.
    async fn execute(&self, query: Q) -> PipelineResult<Q, C> {
        let mut query = query;

        // Stage 1: query hydration, sequential so later hydrators can see
        // earlier hydrators' fields.
        for hydrator in self.query_hydrators() {
            if !hydrator.enable(&query) {
                continue;
            }
            match hydrator.hydrate(&query).await {
                Ok(hydrated) => hydrator.update(&mut query, hydrated),
                Err(e) => log::warn!(
                    "request_id={} query hydrator {} failed: {}",
                    query.request_id(),
                    hydrator.name(),
                    e
                ),
            }
        }

        // Stage 2: candidate fetching across all enabled sources.
        let mut candidates: Vec<C> = Vec::new();
        for source in self.sources() {
            if !source.enable(&query) {
                continue;
            }
            match source.get_candidates(&query).await {
                Ok(mut found) => candidates.append(&mut found),
                Err(e) => log::warn!(
                    "request_id={} source {} failed: {}",
                    query.request_id(),
                    source.name(),
                    e
                ),
            }
        }
        let retrieved_candidates = candidates.clone();

        // Stage 3: scoring. Each scorer writes back only its own fields.
        for scorer in self.scorers() {
            if !scorer.enable(&query) {
                continue;
            }
            match scorer.score(&query, &candidates).await {
                Ok(scored) => {
                    for (candidate, s) in candidates.iter_mut().zip(scored) {
                        scorer.update(candidate, s);
                    }
                }
                Err(e) => log::warn!(
                    "request_id={} scorer {} failed: {}",
                    query.request_id(),
                    scorer.name(),
                    e
                ),
            }
        }

        // Stage 4: filters, sequential, accumulating removals for audit.
        let mut filtered_candidates: Vec<C> = Vec::new();
        for filter in self.filters() {
            if !filter.enable(&query) {
                continue;
            }
            match filter.filter(&query, candidates.clone()).await {
                Ok(result) => {
                    candidates = result.kept;
                    filtered_candidates.extend(result.removed);
                }
                Err(e) => log::warn!(
                    "request_id={} filter {} failed: {}",
                    query.request_id(),
                    filter.name(),
                    e
                ),
            }
        }

        // Stage 5: candidate hydration (rationale and other derived fields).
        for hydrator in self.hydrators() {
            if !hydrator.enable(&query) {
                continue;
            }
            match hydrator.hydrate(&query, &candidates).await {
                Ok(hydrated) => {
                    for (candidate, h) in candidates.iter_mut().zip(hydrated) {
                        hydrator.update(candidate, h);
                    }
                }
                Err(e) => log::warn!(
                    "request_id={} hydrator {} failed: {}",
                    query.request_id(),
                    hydrator.name(),
                    e
                ),
            }
        }

        // Stage 6: selection — rank, tie-break, truncate.
        let mut selected_candidates = if self.selector().enable(&query) {
            self.selector().select(&query, candidates)
        } else {
            candidates
        };
        selected_candidates.truncate(self.result_size());

        // Stage 7: side effects observe the outcome but cannot change it.
        let query_arc = Arc::new(query.clone());
        let input = Arc::new(SideEffectInput {
            query: Arc::clone(&query_arc),
            selected_candidates: selected_candidates.clone(),
        });
        for side_effect in self.side_effects().iter() {
            if !side_effect.enable(Arc::clone(&query_arc)) {
                continue;
            }
            if let Err(e) = side_effect.run(Arc::clone(&input)).await {
                log::warn!(
                    "request_id={} side effect {} failed: {}",
                    query_arc.request_id(),
                    side_effect.name(),
                    e
                );
            }
        }

        PipelineResult {
            query: (*query_arc).clone(),
            retrieved_candidates,
            filtered_candidates,
            selected_candidates,
        }
    }
}
