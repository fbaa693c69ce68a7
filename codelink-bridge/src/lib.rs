//! Exchange bridge — the typed boundary between the decision engine and the
//! national claims exchange (NPHIES).
//!
//! The exchange is a black box consumed through request/response contracts.
//! This crate owns those contracts, the validation gate that keeps
//! caller-correctable errors off the wire, the confirmation step that
//! surfaces prior-auth flags before transmission, and the operational audit
//! trail. The engine never retries exchange failures; rejections are
//! surfaced verbatim and transient failures are left to operator action.

pub mod audit;
pub mod error;
pub mod protocol;
pub mod submission;

pub use audit::{AuditActor, AuditEvent, AuditTrail};
pub use error::{ExchangeError, ExchangeResult};
pub use protocol::{
    ClaimStatus, ClaimSubmissionResponse, ClaimSummary, EligibilityRequest, EligibilityResponse,
    ExchangeClient, PriorAuthRequest, PriorAuthResponse,
};
pub use submission::{prepare_submission, submit_claim, validate_claim, SubmissionPlan};
