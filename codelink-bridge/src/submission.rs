//! The claim submission gate.
//!
//! Two jobs before anything touches the wire: (1) validation — a claim with
//! caller-correctable problems must never reach the exchange; (2) the
//! prior-auth confirmation step — flags are advisory, but the flagged code
//! list must be surfaced to the operator and acknowledged before
//! transmission. The exchange is called exactly once per confirmed claim.

use serde::Serialize;

use codelink_pipeline::claims::Claim;
use codelink_registry::Bundle;

use crate::error::{ExchangeError, ExchangeResult};
use crate::protocol::{ClaimSubmissionResponse, ExchangeClient};

/// Everything the operator needs to see before confirming transmission.
#[derive(Clone, Debug, Serialize)]
pub struct SubmissionPlan {
    /// The payable total at plan time.
    pub total: f64,
    /// The applied bundle, if any.
    pub bundle_id: Option<String>,
    /// Codes currently flagged for prior authorization, in code order.
    pub flagged_codes: Vec<String>,
    /// True when flagged codes exist and the operator must confirm.
    pub requires_confirmation: bool,
}

/// Validate a claim against caller-correctable constraints.
pub fn validate_claim(claim: &Claim) -> ExchangeResult<()> {
    if claim.items.is_empty() {
        return Err(ExchangeError::Validation("claim has no line items".into()));
    }
    for item in &claim.items {
        if item.sbs_code.trim().is_empty() {
            return Err(ExchangeError::Validation(format!(
                "line item {} has no procedure code",
                item.sequence
            )));
        }
        if item.quantity < 1 {
            return Err(ExchangeError::Validation(format!(
                "line item {} has zero quantity",
                item.sequence
            )));
        }
        if item.unit_price < 0.0 {
            return Err(ExchangeError::Validation(format!(
                "line item {} has negative unit price",
                item.sequence
            )));
        }
    }
    Ok(())
}

/// Build the pre-transmission plan: validates the claim and surfaces the
/// prior-auth flag list for operator confirmation.
pub fn prepare_submission(claim: &Claim, catalog: &[Bundle]) -> ExchangeResult<SubmissionPlan> {
    validate_claim(claim)?;

    let flagged_codes: Vec<String> = claim.prior_auth_flags.iter().cloned().collect();
    Ok(SubmissionPlan {
        total: claim.total(catalog),
        bundle_id: claim.bundle_id.clone(),
        requires_confirmation: !flagged_codes.is_empty(),
        flagged_codes,
    })
}

/// Submit a planned claim to the exchange.
///
/// `confirmed` is the operator's acknowledgement of the plan's flagged
/// codes; an unconfirmed flagged claim is refused locally. Exchange
/// failures propagate as-is — rejected means rejected, unreachable means
/// the operator may retry.
pub async fn submit_claim(
    claim: &Claim,
    plan: &SubmissionPlan,
    confirmed: bool,
    client: &dyn ExchangeClient,
) -> ExchangeResult<ClaimSubmissionResponse> {
    if plan.requires_confirmation && !confirmed {
        return Err(ExchangeError::ConfirmationRequired {
            flagged: plan.flagged_codes.len(),
        });
    }

    let response = client.submit_claim(claim).await?;
    log::info!(
        "claim submitted: reference={} status={:?} total={:.2}",
        response.nphies_reference,
        response.status,
        plan.total
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use codelink_pipeline::claims::ClaimItem;
    use codelink_pipeline::prior_auth::PriorAuthPolicy;

    use crate::protocol::{
        ClaimStatus, EligibilityRequest, EligibilityResponse, PriorAuthRequest, PriorAuthResponse,
    };

    /// Mock exchange that counts calls and answers as configured.
    struct MockExchange {
        calls: AtomicUsize,
        outcome: fn() -> ExchangeResult<ClaimSubmissionResponse>,
    }

    impl MockExchange {
        fn accepting() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome: || {
                    Ok(ClaimSubmissionResponse {
                        nphies_reference: "NPH-0001".into(),
                        status: ClaimStatus::Accepted,
                    })
                },
            }
        }

        fn rejecting() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome: || {
                    Err(ExchangeError::Rejected {
                        reason: "policy inactive".into(),
                    })
                },
            }
        }

        fn unreachable() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome: || Err(ExchangeError::Unreachable("connect timeout".into())),
            }
        }
    }

    #[async_trait]
    impl ExchangeClient for MockExchange {
        async fn check_eligibility(
            &self,
            request: &EligibilityRequest,
        ) -> ExchangeResult<EligibilityResponse> {
            Ok(EligibilityResponse {
                eligible: true,
                policy_number: request.policy_number.clone(),
                payer_name: "Mock Payer".into(),
                benefits: Vec::new(),
            })
        }

        async fn submit_claim(&self, _claim: &Claim) -> ExchangeResult<ClaimSubmissionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }

        async fn submit_prior_auth(
            &self,
            _request: &PriorAuthRequest,
        ) -> ExchangeResult<PriorAuthResponse> {
            Ok(PriorAuthResponse {
                auth_number: "AUTH-1".into(),
                status: "approved".into(),
                approved_amount: None,
                valid_until: None,
            })
        }
    }

    fn flagged_claim() -> Claim {
        let policy = PriorAuthPolicy::new(
            ["49518"].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            5000.0,
        );
        let mut claim = Claim::new();
        claim.add_item(ClaimItem::new("49518-00-00", "implant", 1, 45_000.0).unwrap(), &[], &policy);
        claim.add_item(ClaimItem::new("99213-00-00", "visit", 1, 120.0).unwrap(), &[], &policy);
        claim
    }

    fn clean_claim() -> Claim {
        let policy = PriorAuthPolicy::new(BTreeSet::new(), f64::MAX);
        let mut claim = Claim::new();
        claim.add_item(ClaimItem::new("99213-00-00", "visit", 1, 120.0).unwrap(), &[], &policy);
        claim
    }

    #[test]
    fn empty_claim_fails_validation() {
        let claim = Claim::new();
        let err = validate_claim(&claim).unwrap_err();
        assert!(matches!(err, ExchangeError::Validation(_)));
    }

    #[test]
    fn hand_built_zero_quantity_item_fails_validation() {
        // constructed items can't carry a zero quantity, but fields are
        // public, so deserialized or hand-assembled claims still get checked
        let mut claim = Claim::new();
        claim.items.push(ClaimItem {
            sbs_code: "99213-00-00".into(),
            description: "visit".into(),
            quantity: 0,
            unit_price: 800.0,
            sequence: 0,
        });
        let err = validate_claim(&claim).unwrap_err();
        assert!(matches!(err, ExchangeError::Validation(_)));
        assert!(prepare_submission(&claim, &[]).is_err(), "no plan for an invalid claim");
    }

    #[test]
    fn plan_surfaces_flagged_codes() {
        let claim = flagged_claim();
        let plan = prepare_submission(&claim, &[]).unwrap();
        assert!(plan.requires_confirmation);
        assert_eq!(plan.flagged_codes, vec!["49518-00-00".to_string()]);
        assert!((plan.total - 45_120.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn unconfirmed_flagged_claim_never_reaches_exchange() {
        let claim = flagged_claim();
        let plan = prepare_submission(&claim, &[]).unwrap();
        let exchange = MockExchange::accepting();

        let err = submit_claim(&claim, &plan, false, &exchange).await.unwrap_err();
        assert!(matches!(err, ExchangeError::ConfirmationRequired { flagged: 1 }));
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 0, "no wire call");
    }

    #[tokio::test]
    async fn confirmed_flagged_claim_submits_once() {
        let claim = flagged_claim();
        let plan = prepare_submission(&claim, &[]).unwrap();
        let exchange = MockExchange::accepting();

        let response = submit_claim(&claim, &plan, true, &exchange).await.unwrap();
        assert_eq!(response.status, ClaimStatus::Accepted);
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unflagged_claim_needs_no_confirmation() {
        let claim = clean_claim();
        let plan = prepare_submission(&claim, &[]).unwrap();
        assert!(!plan.requires_confirmation);

        let exchange = MockExchange::accepting();
        let response = submit_claim(&claim, &plan, false, &exchange).await.unwrap();
        assert_eq!(response.nphies_reference, "NPH-0001");
    }

    #[tokio::test]
    async fn rejection_surfaces_verbatim_without_retry() {
        let claim = clean_claim();
        let plan = prepare_submission(&claim, &[]).unwrap();
        let exchange = MockExchange::rejecting();

        let err = submit_claim(&claim, &plan, true, &exchange).await.unwrap_err();
        match err {
            ExchangeError::Rejected { reason } => assert_eq!(reason, "policy inactive"),
            other => panic!("expected Rejected, got {:?}", other),
        }
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1, "exactly one attempt");
    }

    #[tokio::test]
    async fn unreachable_is_transient_and_not_retried() {
        let claim = clean_claim();
        let plan = prepare_submission(&claim, &[]).unwrap();
        let exchange = MockExchange::unreachable();

        let err = submit_claim(&claim, &plan, true, &exchange).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Unreachable(_)));
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
    }
}
