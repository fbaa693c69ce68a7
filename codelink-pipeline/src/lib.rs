//! Code normalization and claim-composition decision engine.
//!
//! The engine turns facility-submitted `(internal_code, description)` pairs
//! into ranked standardized-code mappings, triages each mapping event,
//! decides bundled pricing over a claim's line items, flags prior
//! authorization, computes the payable total, and rolls normalization events
//! up into operational telemetry. Everything is deterministic given its
//! inputs; the only side effects live in the event log and the tracing
//! side effect.

pub mod bundle_detector;
pub mod candidate_pipeline;
pub mod claims;
pub mod components;
pub mod error;
pub mod events;
pub mod normalizer;
pub mod pipelines;
pub mod prior_auth;
pub mod stages;
pub mod telemetry;
pub mod triage;
pub mod types;
pub mod util;

pub use bundle_detector::{detect_bundles, BundleDetectionResult, RecommendedBundle};
pub use claims::{Claim, ClaimItem};
pub use error::{EngineError, EngineResult};
pub use events::{EventLog, NormalizationEvent};
pub use normalizer::{Matcher, NormalizeOutcome, Normalizer};
pub use prior_auth::{code_prefix, recompute_flags, requires_prior_auth, PriorAuthPolicy};
pub use telemetry::{aggregate, TelemetrySnapshot};
pub use triage::{classify, Disposition, TriageConfig};
pub use types::{CandidateMapping, MappingQuery};
