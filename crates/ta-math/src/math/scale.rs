//! Min–max rescaling of raw rarity scores.
//!
//! Raw scores follow the "lower = more anomalous" convention. The rescaled
//! rarity flips that so 0 is the most typical point and 1 the least typical.

/// Minimum and maximum of the finite values, or `None` if there are none.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Rarity of one raw score against a `[lo, hi]` reference range.
///
/// A zero-width range uses a divisor of 1. The result is clamped to `[0, 1]`
/// so scores outside the reference range saturate instead of overflowing.
pub fn rarity_in_range(raw: f64, lo: f64, hi: f64) -> f64 {
    let denom = if hi > lo { hi - lo } else { 1.0 };
    (1.0 - (raw - lo) / denom).clamp(0.0, 1.0)
}

/// Rescale a batch of raw scores into rarities using the batch's own range.
///
/// For a non-degenerate batch the highest raw score maps to 0 and the lowest
/// to 1. An empty batch yields an empty vector.
pub fn rarity_min_max(raw: &[f64]) -> Vec<f64> {
    let Some((lo, hi)) = min_max(raw) else {
        return Vec::new();
    };
    raw.iter().map(|&r| rarity_in_range(r, lo, hi)).collect()
}
