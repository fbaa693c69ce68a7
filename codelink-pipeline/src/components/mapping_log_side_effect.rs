use std::sync::Arc;

use async_trait::async_trait;

use crate::stages::{SideEffect, SideEffectInput};
use crate::types::{CandidateMapping, MappingQuery};

/// Logs the outcome of every mapping request for operational visibility.
/// The durable `NormalizationEvent` record is the caller's responsibility;
/// this side effect is just the live trace.
pub struct MappingLogSideEffect;

#[async_trait]
impl SideEffect<MappingQuery, CandidateMapping> for MappingLogSideEffect {
    async fn run(
        &self,
        input: Arc<SideEffectInput<MappingQuery, CandidateMapping>>,
    ) -> Result<(), String> {
        match input.selected_candidates.first() {
            Some(top) => log::info!(
                "request_id={} facility={} internal_code={} top={} confidence={:.3} ({} candidates)",
                input.query.request_id,
                input.query.facility_id,
                input.query.internal_code,
                top.code,
                top.confidence,
                input.selected_candidates.len()
            ),
            None => log::info!(
                "request_id={} facility={} internal_code={} no candidates",
                input.query.request_id,
                input.query.facility_id,
                input.query.internal_code
            ),
        }
        Ok(())
    }
}
