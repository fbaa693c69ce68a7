use std::sync::Arc;

use async_trait::async_trait;

use codelink_registry::SbsRegistry;

use crate::candidate_pipeline::CandidatePipeline;
use crate::components::alias_boost_scorer::AliasBoostScorer;
use crate::components::mapping_log_side_effect::MappingLogSideEffect;
use crate::components::ranked_candidate_selector::RankedCandidateSelector;
use crate::components::rationale_hydrator::RationaleHydrator;
use crate::components::registry_match_source::RegistryMatchSource;
use crate::components::text_prep_query_hydrator::TextPrepQueryHydrator;
use crate::components::weak_match_filter::WeakMatchFilter;
use crate::stages::{Filter, Hydrator, QueryHydrator, Scorer, Selector, SideEffect, Source};
use crate::types::{CandidateMapping, MappingQuery};

/// The code normalization pipeline.
///
/// Pipeline flow:
/// 1. TextPrepQueryHydrator tokenizes the description and facility code
/// 2. RegistryMatchSource scans the SBS registry for lexical matches
/// 3. AliasBoostScorer finalizes confidence, boosting registered aliases
/// 4. WeakMatchFilter drops candidates below the confidence floor
/// 5. RationaleHydrator attaches the human-readable rationale
/// 6. RankedCandidateSelector orders by confidence with code tie-breaks
/// 7. MappingLogSideEffect traces the outcome
pub struct NormalizationPipeline {
    query_hydrators: Vec<Box<dyn QueryHydrator<MappingQuery>>>,
    sources: Vec<Box<dyn Source<MappingQuery, CandidateMapping>>>,
    hydrators: Vec<Box<dyn Hydrator<MappingQuery, CandidateMapping>>>,
    filters: Vec<Box<dyn Filter<MappingQuery, CandidateMapping>>>,
    scorers: Vec<Box<dyn Scorer<MappingQuery, CandidateMapping>>>,
    selector: RankedCandidateSelector,
    side_effects: Arc<Vec<Box<dyn SideEffect<MappingQuery, CandidateMapping>>>>,
    result_size: usize,
}

impl NormalizationPipeline {
    /// Create a pipeline over a loaded registry.
    pub fn with_registry(registry: Arc<SbsRegistry>) -> Self {
        Self::with_registry_and_size(registry, RankedCandidateSelector::default().k)
    }

    /// Create a pipeline with a custom result size.
    pub fn with_registry_and_size(registry: Arc<SbsRegistry>, result_size: usize) -> Self {
        let query_hydrators: Vec<Box<dyn QueryHydrator<MappingQuery>>> =
            vec![Box::new(TextPrepQueryHydrator)];

        let sources: Vec<Box<dyn Source<MappingQuery, CandidateMapping>>> =
            vec![Box::new(RegistryMatchSource::new(Arc::clone(&registry)))];

        let scorers: Vec<Box<dyn Scorer<MappingQuery, CandidateMapping>>> =
            vec![Box::new(AliasBoostScorer::new(registry))];

        let filters: Vec<Box<dyn Filter<MappingQuery, CandidateMapping>>> =
            vec![Box::new(WeakMatchFilter::default())];

        let hydrators: Vec<Box<dyn Hydrator<MappingQuery, CandidateMapping>>> =
            vec![Box::new(RationaleHydrator)];

        let selector = RankedCandidateSelector { k: result_size };

        let side_effects: Arc<Vec<Box<dyn SideEffect<MappingQuery, CandidateMapping>>>> =
            Arc::new(vec![Box::new(MappingLogSideEffect)]);

        Self {
            query_hydrators,
            sources,
            hydrators,
            filters,
            scorers,
            selector,
            side_effects,
            result_size,
        }
    }
}

#[async_trait]
impl CandidatePipeline<MappingQuery, CandidateMapping> for NormalizationPipeline {
    fn query_hydrators(&self) -> &[Box<dyn QueryHydrator<MappingQuery>>] {
        &self.query_hydrators
    }

    fn sources(&self) -> &[Box<dyn Source<MappingQuery, CandidateMapping>>] {
        &self.sources
    }

    fn hydrators(&self) -> &[Box<dyn Hydrator<MappingQuery, CandidateMapping>>] {
        &self.hydrators
    }

    fn filters(&self) -> &[Box<dyn Filter<MappingQuery, CandidateMapping>>] {
        &self.filters
    }

    fn scorers(&self) -> &[Box<dyn Scorer<MappingQuery, CandidateMapping>>] {
        &self.scorers
    }

    fn selector(&self) -> &dyn Selector<MappingQuery, CandidateMapping> {
        &self.selector
    }

    fn side_effects(&self) -> Arc<Vec<Box<dyn SideEffect<MappingQuery, CandidateMapping>>>> {
        Arc::clone(&self.side_effects)
    }

    fn result_size(&self) -> usize {
        self.result_size
    }
}
