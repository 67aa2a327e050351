//! Header-condition merging.

use super::permissions::HeaderConditions;

/// Merge `overrides` over `base`. Keys in `overrides` win; keys only in
/// `base` carry through unchanged.
pub fn combine_headers(base: &HeaderConditions, overrides: &HeaderConditions) -> HeaderConditions {
    let mut combined = base.clone();
    combined.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    combined
}
