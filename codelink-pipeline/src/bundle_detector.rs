//! Bundle detection over a claim's current line items.
//!
//! Pure function of the current code multiset and the bundle catalog:
//! coverage uses set semantics (duplicate items still count once toward
//! coverage), savings sums the net price of every covered item. Recomputed
//! on every item add or remove, never persisted.

use std::collections::BTreeSet;

use serde::Serialize;

use codelink_registry::Bundle;

use crate::claims::ClaimItem;
use crate::util::round_cents;

/// The bundle the detector recommends applying, with the payer math.
#[derive(Clone, Debug, Serialize)]
pub struct RecommendedBundle {
    pub id: String,
    pub name: String,
    /// The fixed price billed if applied.
    pub total_price: f64,
    /// Itemized sum of covered items minus the bundle price. Non-negative
    /// by construction; a bundle that costs more than the items is never
    /// recommended.
    pub savings: f64,
}

/// Result of one detection pass.
#[derive(Clone, Debug, Serialize)]
pub struct BundleDetectionResult {
    /// True when at least one catalog bundle is fully covered, regardless
    /// of whether applying it would save anything.
    pub has_applicable_bundles: bool,
    /// The covered bundle with the greatest savings, if any has savings ≥ 0.
    pub recommended: Option<RecommendedBundle>,
    /// All fully-covered bundles, in catalog order.
    pub candidate_bundles: Vec<Bundle>,
}

/// Sum of net prices across items whose code belongs to the bundle.
fn covered_item_sum(items: &[ClaimItem], bundle: &Bundle) -> f64 {
    items
        .iter()
        .filter(|item| bundle.member_codes.contains(&item.sbs_code))
        .map(ClaimItem::net_price)
        .sum()
}

/// Detect every catalog bundle fully covered by the claim's items and pick
/// the recommendation.
///
/// Selection rule: maximize savings; ties broken by smaller bundle price
/// (cheapest for the payer), then by ascending bundle id for full
/// determinism.
pub fn detect_bundles(items: &[ClaimItem], catalog: &[Bundle]) -> BundleDetectionResult {
    let codes: BTreeSet<String> = items.iter().map(|i| i.sbs_code.clone()).collect();

    let candidate_bundles: Vec<Bundle> = catalog
        .iter()
        .filter(|b| b.covered_by(&codes))
        .cloned()
        .collect();

    let recommended = candidate_bundles
        .iter()
        .filter_map(|b| {
            let savings = round_cents(covered_item_sum(items, b) - b.bundle_price);
            if savings >= 0.0 {
                Some((b, savings))
            } else {
                None
            }
        })
        .max_by(|(a, sa), (b, sb)| {
            sa.partial_cmp(sb)
                .unwrap_or(std::cmp::Ordering::Equal)
                // max_by keeps the later element on Equal, so invert the
                // secondary keys: lower price and lower id must win.
                .then_with(|| b.bundle_price.partial_cmp(&a.bundle_price).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| b.id.cmp(&a.id))
        })
        .map(|(b, savings)| RecommendedBundle {
            id: b.id.clone(),
            name: b.name.clone(),
            total_price: b.bundle_price,
            savings,
        });

    BundleDetectionResult {
        has_applicable_bundles: !candidate_bundles.is_empty(),
        recommended,
        candidate_bundles,
    }
}
