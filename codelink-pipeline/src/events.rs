//! The durable normalization event log.
//!
//! One `NormalizationEvent` is appended per normalization request and never
//! deleted. Events are immutable after creation except for the operator
//! override of `chosen_code`, which flips `overridden` for audit but never
//! reclassifies the event's disposition.
//!
//! Concurrency model: any number of facility sessions append concurrently;
//! the telemetry aggregator reads a snapshot copy so it never holds the
//! write lock across its computation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::normalizer::NormalizeOutcome;
use crate::triage::{classify, Disposition, TriageConfig};
use crate::types::{CandidateMapping, MappingQuery};

/// The audit record for one normalization request.
#[derive(Clone, Debug, Serialize)]
pub struct NormalizationEvent {
    pub id: String,
    /// Source-timezone timestamp; daily telemetry buckets respect the offset.
    pub timestamp: DateTime<FixedOffset>,
    pub facility_id: String,
    pub internal_code: String,
    pub description: String,
    pub candidates: Vec<CandidateMapping>,
    /// The engine's choice (top candidate) or the operator's override.
    pub chosen_code: Option<String>,
    /// Top candidate confidence at normalization time.
    pub confidence: Option<f64>,
    pub disposition: Disposition,
    pub overridden: bool,
    pub latency_ms: u64,
}

impl NormalizationEvent {
    /// Build an event from a normalization outcome. Classification happens
    /// here, exactly once, from the top candidate's confidence.
    pub fn from_outcome(
        id: String,
        timestamp: DateTime<FixedOffset>,
        query: &MappingQuery,
        outcome: &NormalizeOutcome,
        config: &TriageConfig,
    ) -> Self {
        let confidence = outcome.top_confidence();
        Self {
            id,
            timestamp,
            facility_id: query.facility_id.clone(),
            internal_code: query.internal_code.clone(),
            description: query.description.clone(),
            candidates: outcome.candidates.clone(),
            chosen_code: outcome.chosen_code().map(String::from),
            confidence,
            disposition: classify(confidence, config),
            overridden: false,
            latency_ms: outcome.latency_ms,
        }
    }
}

/// Append-only event log with snapshot reads.
#[derive(Default)]
pub struct EventLog {
    events: RwLock<Vec<NormalizationEvent>>,
    next_id: AtomicU64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next monotonic event id.
    pub fn next_event_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("evt-{:06}", n)
    }

    /// Append one event. Never fails; the log grows without bound by design.
    pub fn append(&self, event: NormalizationEvent) {
        self.events
            .write()
            .expect("event log lock poisoned")
            .push(event);
    }

    /// Record a normalization outcome as a new event and return its id.
    pub fn record(
        &self,
        timestamp: DateTime<FixedOffset>,
        query: &MappingQuery,
        outcome: &NormalizeOutcome,
        config: &TriageConfig,
    ) -> String {
        let id = self.next_event_id();
        self.append(NormalizationEvent::from_outcome(
            id.clone(),
            timestamp,
            query,
            outcome,
            config,
        ));
        id
    }

    /// Snapshot copy of the whole log. Readers work on the copy so writers
    /// are never blocked by aggregation.
    pub fn snapshot(&self) -> Vec<NormalizationEvent> {
        self.events
            .read()
            .expect("event log lock poisoned")
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().expect("event log lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One facility's events in timestamp order.
    pub fn facility_events(&self, facility_id: &str) -> Vec<NormalizationEvent> {
        let mut events: Vec<NormalizationEvent> = self
            .snapshot()
            .into_iter()
            .filter(|e| e.facility_id == facility_id)
            .collect();
        events.sort_by_key(|e| e.timestamp);
        events
    }

    /// Operator override: select a different code than the engine's choice.
    /// Sets `overridden` for audit; the original disposition stands.
    pub fn record_override(&self, event_id: &str, new_code: &str) -> EngineResult<()> {
        let mut events = self.events.write().expect("event log lock poisoned");
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| EngineError::UnknownEvent(event_id.to_string()))?;
        event.chosen_code = Some(new_code.to_string());
        event.overridden = true;
        Ok(())
    }
}
