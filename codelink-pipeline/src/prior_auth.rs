//! Prior-authorization policy evaluation.
//!
//! Advisory, not blocking: flags accumulate on the claim and the submission
//! path surfaces them for operator confirmation, but a flagged claim can
//! still be submitted. Flags are always recomputed from the current item
//! set, never appended, so removing the triggering item purges its flag.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::claims::ClaimItem;

/// Prior-authorization policy configuration.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PriorAuthPolicy {
    /// Leading code segments (before the first separator) that always
    /// require prior authorization regardless of price.
    pub high_value_prefixes: BTreeSet<String>,
    /// Unit price above which any item requires prior authorization.
    pub price_threshold: f64,
}

impl PriorAuthPolicy {
    pub fn new(high_value_prefixes: BTreeSet<String>, price_threshold: f64) -> Self {
        Self {
            high_value_prefixes,
            price_threshold,
        }
    }
}

/// The leading segment of an SBS code, up to its first separator.
/// "49518-00-00" → "49518"; a code with no separator is its own prefix.
pub fn code_prefix(sbs_code: &str) -> &str {
    sbs_code
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or(sbs_code)
}

/// Whether one line item requires prior authorization under the policy.
pub fn requires_prior_auth(item: &ClaimItem, policy: &PriorAuthPolicy) -> bool {
    policy.high_value_prefixes.contains(code_prefix(&item.sbs_code))
        || item.unit_price > policy.price_threshold
}

/// Rebuild the claim's flag set from scratch over the current items.
pub fn recompute_flags(items: &[ClaimItem], policy: &PriorAuthPolicy) -> BTreeSet<String> {
    items
        .iter()
        .filter(|item| requires_prior_auth(item, policy))
        .map(|item| item.sbs_code.clone())
        .collect()
}
