//! Claim composition: line items, bundle application, and the payable total.
//!
//! A claim is edited by one operator session at a time; mutation is a plain
//! `&mut self` call and every mutation recomputes the derived fields (bundle
//! applicability, prior-auth flags) from the current item set. Nothing
//! derived is ever hand-edited or incrementally patched.

use std::collections::BTreeSet;

use serde::Serialize;

use codelink_registry::Bundle;

use crate::bundle_detector::{detect_bundles, BundleDetectionResult};
use crate::error::{EngineError, EngineResult};
use crate::prior_auth::{recompute_flags, PriorAuthPolicy};
use crate::util::round_cents;

/// One claim line item. `net_price` is always derived, never stored.
#[derive(Clone, Debug, Serialize)]
pub struct ClaimItem {
    pub sbs_code: String,
    pub description: String,
    /// At least 1; construction rejects anything less.
    pub quantity: u32,
    /// Non-negative and finite; construction rejects anything else.
    pub unit_price: f64,
    /// Position within the claim, assigned on add.
    pub sequence: u32,
}

impl ClaimItem {
    /// Build a line item. A zero quantity or a negative price is a
    /// caller-correctable input problem and is rejected here rather than
    /// silently corrected into a billable line.
    pub fn new(
        sbs_code: &str,
        description: &str,
        quantity: u32,
        unit_price: f64,
    ) -> EngineResult<Self> {
        if quantity < 1 {
            return Err(EngineError::Validation(format!(
                "item '{}': quantity must be at least 1",
                sbs_code
            )));
        }
        if !unit_price.is_finite() || unit_price < 0.0 {
            return Err(EngineError::Validation(format!(
                "item '{}': unit price must be a non-negative amount",
                sbs_code
            )));
        }
        Ok(Self {
            sbs_code: sbs_code.to_string(),
            description: description.to_string(),
            quantity,
            unit_price,
            sequence: 0,
        })
    }

    /// quantity × unit price, rounded to cents.
    pub fn net_price(&self) -> f64 {
        round_cents(self.quantity as f64 * self.unit_price)
    }
}

/// A claim under composition.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Claim {
    pub items: Vec<ClaimItem>,
    pub bundle_applied: bool,
    pub bundle_id: Option<String>,
    /// SBS codes currently requiring prior authorization. Derived purely
    /// from `items`; recomputed on every mutation.
    pub prior_auth_flags: BTreeSet<String>,
    next_sequence: u32,
}

impl Claim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line item and recompute bundle applicability and prior-auth
    /// flags. Returns the fresh detection result so the caller can surface
    /// a newly available bundle recommendation.
    pub fn add_item(
        &mut self,
        mut item: ClaimItem,
        catalog: &[Bundle],
        policy: &PriorAuthPolicy,
    ) -> BundleDetectionResult {
        item.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.items.push(item);
        self.recompute(catalog, policy)
    }

    /// Remove the item at the given sequence, recomputing derived state.
    /// Removing an item can invalidate an applied bundle; in that case
    /// `bundle_applied` is cleared and the total reverts to the itemized sum.
    pub fn remove_item(
        &mut self,
        sequence: u32,
        catalog: &[Bundle],
        policy: &PriorAuthPolicy,
    ) -> EngineResult<BundleDetectionResult> {
        let before = self.items.len();
        self.items.retain(|i| i.sequence != sequence);
        if self.items.len() == before {
            return Err(EngineError::Validation(format!(
                "no claim item with sequence {}",
                sequence
            )));
        }
        Ok(self.recompute(catalog, policy))
    }

    /// Apply a bundle by id. The bundle must currently be a covered
    /// candidate; applying an uncovered bundle is a caller error.
    pub fn apply_bundle(&mut self, bundle_id: &str, catalog: &[Bundle]) -> EngineResult<()> {
        let detection = detect_bundles(&self.items, catalog);
        if !detection
            .candidate_bundles
            .iter()
            .any(|b| b.id == bundle_id)
        {
            return Err(EngineError::Validation(format!(
                "bundle '{}' is not covered by the current items",
                bundle_id
            )));
        }
        self.bundle_applied = true;
        self.bundle_id = Some(bundle_id.to_string());
        Ok(())
    }

    /// Switch bundled pricing off. The itemized sum is always recoverable
    /// exactly because items are never mutated by bundle application.
    pub fn clear_bundle(&mut self) {
        self.bundle_applied = false;
        self.bundle_id = None;
    }

    /// Sum of net prices over all current items.
    pub fn itemized_total(&self) -> f64 {
        round_cents(self.items.iter().map(ClaimItem::net_price).sum())
    }

    /// The payable amount: the bundle price while a valid bundle is applied,
    /// otherwise the itemized sum. Pure and idempotent.
    pub fn total(&self, catalog: &[Bundle]) -> f64 {
        if self.bundle_applied {
            if let Some(id) = &self.bundle_id {
                let detection = detect_bundles(&self.items, catalog);
                if let Some(bundle) = detection.candidate_bundles.iter().find(|b| b.id == *id) {
                    return round_cents(bundle.bundle_price);
                }
            }
        }
        self.itemized_total()
    }

    /// Recompute all derived state after a mutation.
    fn recompute(&mut self, catalog: &[Bundle], policy: &PriorAuthPolicy) -> BundleDetectionResult {
        let detection = detect_bundles(&self.items, catalog);

        // An applied bundle that lost coverage is cleared, not left stale.
        if self.bundle_applied {
            let still_covered = self
                .bundle_id
                .as_ref()
                .map(|id| detection.candidate_bundles.iter().any(|b| b.id == *id))
                .unwrap_or(false);
            if !still_covered {
                self.clear_bundle();
            }
        }

        self.prior_auth_flags = recompute_flags(&self.items, policy);
        detection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn bundle(id: &str, price: f64, members: &[&str]) -> Bundle {
        Bundle {
            id: id.into(),
            name: format!("bundle {}", id),
            member_codes: members.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            bundle_price: price,
        }
    }

    fn no_policy() -> PriorAuthPolicy {
        PriorAuthPolicy::new(BTreeSet::new(), f64::MAX)
    }

    #[test]
    fn unbundled_total_is_exact_item_sum() {
        let mut claim = Claim::new();
        let catalog: Vec<Bundle> = Vec::new();
        let policy = no_policy();
        claim.add_item(ClaimItem::new("90471-00-00", "immunization", 1, 500.0).unwrap(), &catalog, &policy);
        claim.add_item(ClaimItem::new("99213-00-00", "office visit", 1, 800.0).unwrap(), &catalog, &policy);

        assert!(!claim.bundle_applied);
        assert_eq!(claim.total(&catalog), 1300.0);
        // idempotent: repeated calls with no mutation yield the same result
        assert_eq!(claim.total(&catalog), 1300.0);
    }

    #[test]
    fn applied_bundle_prices_the_claim() {
        let catalog = vec![bundle("BND-001", 1000.0, &["A-1", "B-2"])];
        let policy = no_policy();
        let mut claim = Claim::new();
        claim.add_item(ClaimItem::new("A-1", "a", 1, 700.0).unwrap(), &catalog, &policy);
        claim.add_item(ClaimItem::new("B-2", "b", 1, 600.0).unwrap(), &catalog, &policy);

        claim.apply_bundle("BND-001", &catalog).unwrap();
        assert_eq!(claim.total(&catalog), 1000.0);

        // switching bundling off restores the itemized sum exactly
        claim.clear_bundle();
        assert_eq!(claim.total(&catalog), 1300.0);
    }

    #[test]
    fn applying_uncovered_bundle_is_rejected() {
        let catalog = vec![bundle("BND-001", 1000.0, &["A-1", "B-2"])];
        let policy = no_policy();
        let mut claim = Claim::new();
        claim.add_item(ClaimItem::new("A-1", "a", 1, 700.0).unwrap(), &catalog, &policy);

        let err = claim.apply_bundle("BND-001", &catalog).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(!claim.bundle_applied);
    }

    #[test]
    fn removing_covering_item_clears_applied_bundle() {
        let catalog = vec![bundle("BND-001", 1000.0, &["A-1", "B-2"])];
        let policy = no_policy();
        let mut claim = Claim::new();
        claim.add_item(ClaimItem::new("A-1", "a", 1, 700.0).unwrap(), &catalog, &policy);
        claim.add_item(ClaimItem::new("B-2", "b", 1, 600.0).unwrap(), &catalog, &policy);
        claim.apply_bundle("BND-001", &catalog).unwrap();

        let b2_sequence = claim.items[1].sequence;
        claim.remove_item(b2_sequence, &catalog, &policy).unwrap();

        assert!(!claim.bundle_applied, "bundle must clear when coverage is lost");
        assert!(claim.bundle_id.is_none());
        assert_eq!(claim.total(&catalog), 700.0);
    }

    #[test]
    fn stale_applied_bundle_falls_back_to_itemized_total() {
        // total() itself revalidates coverage even if recompute was bypassed
        let catalog = vec![bundle("BND-001", 1000.0, &["A-1", "B-2"])];
        let policy = no_policy();
        let mut claim = Claim::new();
        claim.add_item(ClaimItem::new("A-1", "a", 1, 700.0).unwrap(), &catalog, &policy);
        claim.bundle_applied = true;
        claim.bundle_id = Some("BND-001".into());

        assert_eq!(claim.total(&catalog), 700.0);
    }

    #[test]
    fn prior_auth_flags_track_mutations() {
        let catalog: Vec<Bundle> = Vec::new();
        let policy = PriorAuthPolicy::new(
            ["49518"].iter().map(|s| s.to_string()).collect(),
            5_000.0,
        );
        let mut claim = Claim::new();
        claim.add_item(ClaimItem::new("49518-00-00", "implant", 1, 45_000.0).unwrap(), &catalog, &policy);
        claim.add_item(ClaimItem::new("SBS-0001", "consult", 1, 6_000.0).unwrap(), &catalog, &policy);
        claim.add_item(ClaimItem::new("SBS-0002", "dressing", 1, 50.0).unwrap(), &catalog, &policy);

        assert_eq!(claim.prior_auth_flags.len(), 2);
        assert!(claim.prior_auth_flags.contains("49518-00-00"));
        assert!(claim.prior_auth_flags.contains("SBS-0001"));

        let implant_sequence = claim.items[0].sequence;
        claim.remove_item(implant_sequence, &catalog, &policy).unwrap();
        assert!(!claim.prior_auth_flags.contains("49518-00-00"));
        assert_eq!(claim.prior_auth_flags.len(), 1);
    }

    #[test]
    fn zero_quantity_and_negative_price_are_rejected() {
        assert!(matches!(
            ClaimItem::new("SBS-0001", "x", 0, 10.0),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            ClaimItem::new("SBS-0001", "x", 1, -5.0),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            ClaimItem::new("SBS-0001", "x", 1, f64::NAN),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn rejected_item_never_becomes_a_billable_line() {
        let policy = no_policy();
        let mut claim = Claim::new();
        let zero_quantity = ClaimItem::new("99213-00-00", "visit", 0, 800.0);
        assert!(zero_quantity.is_err(), "a zero-quantity item must be refused");
        if let Ok(item) = zero_quantity {
            claim.add_item(item, &[], &policy);
        }
        assert!(claim.items.is_empty());
        assert_eq!(claim.total(&[]), 0.0);
    }

    #[test]
    fn removing_unknown_sequence_errors() {
        let catalog: Vec<Bundle> = Vec::new();
        let policy = no_policy();
        let mut claim = Claim::new();
        claim.add_item(ClaimItem::new("A-1", "a", 1, 10.0).unwrap(), &catalog, &policy);
        assert!(claim.remove_item(99, &catalog, &policy).is_err());
    }
}
