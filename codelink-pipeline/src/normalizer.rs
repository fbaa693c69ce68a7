//! The code normalizer facade.
//!
//! Wraps the normalization pipeline behind the `Matcher` seam with a
//! caller-imposed timeout. When the matcher fails or times out the
//! normalizer degrades to cached-alias heuristic matching instead of
//! propagating an error: the caller always receives a response that can be
//! triaged (possibly `NoMatch`), never an unhandled matcher failure.
//! Malformed input is the one distinct error path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use codelink_registry::thresholds::FALLBACK_CONFIDENCE;
use codelink_registry::SbsRegistry;

use crate::candidate_pipeline::CandidatePipeline;
use crate::error::{EngineError, EngineResult};
use crate::pipelines::normalization::NormalizationPipeline;
use crate::types::{CandidateMapping, MappingQuery};

/// Default caller-imposed timeout on the matcher.
const DEFAULT_MATCHER_TIMEOUT: Duration = Duration::from_secs(3);

/// The matcher seam. The production implementation runs the in-process
/// normalization pipeline; tests substitute failing or slow matchers to
/// exercise the degraded path.
#[async_trait]
pub trait Matcher: Send + Sync {
    async fn candidates(&self, query: &MappingQuery) -> Result<Vec<CandidateMapping>, String>;
}

/// Production matcher backed by the normalization pipeline.
pub struct PipelineMatcher {
    pipeline: NormalizationPipeline,
}

impl PipelineMatcher {
    pub fn new(registry: Arc<SbsRegistry>) -> Self {
        Self {
            pipeline: NormalizationPipeline::with_registry(registry),
        }
    }
}

#[async_trait]
impl Matcher for PipelineMatcher {
    async fn candidates(&self, query: &MappingQuery) -> Result<Vec<CandidateMapping>, String> {
        let result = self.pipeline.execute(query.clone()).await;
        Ok(result.selected_candidates)
    }
}

/// What one normalization call produced.
#[derive(Clone, Debug)]
pub struct NormalizeOutcome {
    /// Ranked candidates, best first. May be empty (triages to `NoMatch`).
    pub candidates: Vec<CandidateMapping>,
    /// Wall-clock latency of the matching call.
    pub latency_ms: u64,
    /// True when the outcome came from the degraded cached-alias path.
    pub degraded: bool,
}

impl NormalizeOutcome {
    /// The code the engine would choose absent operator intervention.
    pub fn chosen_code(&self) -> Option<&str> {
        self.candidates.first().map(|c| c.code.as_str())
    }

    /// Top candidate confidence, the triage classifier input.
    pub fn top_confidence(&self) -> Option<f64> {
        self.candidates.first().map(|c| c.confidence)
    }
}

/// The normalizer: pure function of (input, registry) apart from latency
/// measurement. Event logging is the caller's job.
pub struct Normalizer {
    matcher: Arc<dyn Matcher>,
    registry: Arc<SbsRegistry>,
    matcher_timeout: Duration,
}

impl Normalizer {
    pub fn new(registry: Arc<SbsRegistry>) -> Self {
        let matcher = Arc::new(PipelineMatcher::new(Arc::clone(&registry)));
        Self::with_matcher(registry, matcher, DEFAULT_MATCHER_TIMEOUT)
    }

    /// Construct with an explicit matcher and timeout. Test seam, and the
    /// hook for an out-of-process matcher service.
    pub fn with_matcher(
        registry: Arc<SbsRegistry>,
        matcher: Arc<dyn Matcher>,
        matcher_timeout: Duration,
    ) -> Self {
        Self {
            matcher,
            registry,
            matcher_timeout,
        }
    }

    /// Normalize one facility-submitted `(internal_code, description)` pair
    /// into ranked candidate mappings.
    pub async fn normalize(&self, query: MappingQuery) -> EngineResult<NormalizeOutcome> {
        if query.internal_code.trim().is_empty() && query.description.trim().is_empty() {
            return Err(EngineError::Validation(
                "normalization requires an internal code or a description".into(),
            ));
        }

        let start = Instant::now();
        let matched = tokio::time::timeout(self.matcher_timeout, self.matcher.candidates(&query)).await;

        let (candidates, degraded) = match matched {
            Ok(Ok(candidates)) => (candidates, false),
            Ok(Err(e)) => {
                log::warn!(
                    "request_id={} matcher failed, degrading to cached aliases: {}",
                    query.request_id,
                    e
                );
                (self.fallback_candidates(&query), true)
            }
            Err(_) => {
                log::warn!(
                    "request_id={} matcher timed out after {:?}, degrading to cached aliases",
                    query.request_id,
                    self.matcher_timeout
                );
                (self.fallback_candidates(&query), true)
            }
        };

        Ok(NormalizeOutcome {
            candidates,
            latency_ms: start.elapsed().as_millis() as u64,
            degraded,
        })
    }

    /// Degraded heuristic path: an exact cached-alias hit yields one
    /// low-confidence candidate; anything else yields no candidates, which
    /// triages to `NoMatch` rather than erroring.
    fn fallback_candidates(&self, query: &MappingQuery) -> Vec<CandidateMapping> {
        match self.registry.lookup_alias(&query.internal_code) {
            Some(entry) => vec![CandidateMapping {
                code: entry.code.clone(),
                description: entry.description.clone(),
                confidence: FALLBACK_CONFIDENCE,
                rationale: "degraded match: matcher unavailable, served from cached facility alias"
                    .into(),
                alias_hit: true,
                degraded: true,
                ..CandidateMapping::default()
            }],
            None => Vec::new(),
        }
    }
}
