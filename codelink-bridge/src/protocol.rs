//! Request/response contracts for the national claims exchange.
//!
//! These are the only shapes the engine knows about the exchange; the wire
//! protocol behind them is out of scope. All shapes are serde-derived JSON.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use codelink_pipeline::claims::Claim;

use crate::error::ExchangeResult;

// ---------------------------------------------------------------------------
// Eligibility
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EligibilityRequest {
    pub patient_id: String,
    pub insurer_id: String,
    pub policy_number: String,
    pub service_date: NaiveDate,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EligibilityResponse {
    pub eligible: bool,
    pub policy_number: String,
    pub payer_name: String,
    /// Benefit descriptions as returned by the exchange; opaque to the engine.
    pub benefits: Vec<String>,
}

// ---------------------------------------------------------------------------
// Claim submission
// ---------------------------------------------------------------------------

/// Terminal and in-flight claim states as reported by the exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClaimStatus {
    Queued,
    Accepted,
    Denied,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimSubmissionResponse {
    /// The exchange's reference for the submitted claim.
    pub nphies_reference: String,
    pub status: ClaimStatus,
}

/// One row of the claims listing read API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub claim_id: String,
    /// Patient display name when known, otherwise the bare patient id.
    pub patient: String,
    pub facility_id: String,
    pub claim_type: String,
    pub created_at: DateTime<FixedOffset>,
    pub status: ClaimStatus,
}

// ---------------------------------------------------------------------------
// Prior authorization
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriorAuthRequest {
    pub patient_id: String,
    pub facility_id: String,
    pub sbs_code: String,
    pub diagnosis: String,
    pub description: String,
    pub estimated_amount: f64,
    pub expected_date: NaiveDate,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriorAuthResponse {
    pub auth_number: String,
    pub status: String,
    pub approved_amount: Option<f64>,
    pub valid_until: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// The exchange seam
// ---------------------------------------------------------------------------

/// The exchange service as the engine sees it. Implemented elsewhere
/// (HTTP transport); tests substitute mocks. Every call is a single
/// request/response with a transport-owned timeout — no retries here.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn check_eligibility(
        &self,
        request: &EligibilityRequest,
    ) -> ExchangeResult<EligibilityResponse>;

    async fn submit_claim(&self, claim: &Claim) -> ExchangeResult<ClaimSubmissionResponse>;

    async fn submit_prior_auth(
        &self,
        request: &PriorAuthRequest,
    ) -> ExchangeResult<PriorAuthResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_status_serializes_kebab_case() {
        let json = serde_json::to_string(&ClaimStatus::Accepted).unwrap();
        assert_eq!(json, "\"accepted\"");
        let back: ClaimStatus = serde_json::from_str("\"denied\"").unwrap();
        assert_eq!(back, ClaimStatus::Denied);
    }

    #[test]
    fn eligibility_request_round_trips() {
        let request = EligibilityRequest {
            patient_id: "pat-100".into(),
            insurer_id: "ins-7".into(),
            policy_number: "POL-2231".into(),
            service_date: NaiveDate::from_ymd_opt(2026, 8, 20).unwrap(),
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: EligibilityRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.policy_number, "POL-2231");
    }
}
