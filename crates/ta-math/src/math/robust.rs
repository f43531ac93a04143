//! Robust location and dispersion estimators.
//!
//! All functions treat their input as a population (no Bessel correction)
//! and return `None` for empty input instead of panicking or producing NaN.

use serde::{Deserialize, Serialize};

/// Which estimator produced a spread value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadSource {
    /// Median absolute deviation around the median.
    Mad,
    /// Population standard deviation, used when the MAD collapses to zero.
    StdDev,
}

impl std::fmt::Display for SpreadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpreadSource::Mad => write!(f, "mad"),
            SpreadSource::StdDev => write!(f, "std_dev"),
        }
    }
}

/// A spread estimate together with the estimator that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadEstimate {
    pub value: f64,
    pub source: SpreadSource,
}

/// Median of the values (mean of the two middle elements for even length).
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(median_sorted(&sorted))
}

/// Median of an already sorted, non-empty slice.
fn median_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median absolute deviation around `center`, unscaled.
///
/// No consistency constant is applied: the result is exactly
/// `median(|x - center|)`.
pub fn mad(values: &[f64], center: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    deviations.sort_by(|a, b| a.total_cmp(b));
    Some(median_sorted(&deviations))
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`).
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Median and spread for a window of values.
///
/// The spread is the MAD; when the MAD is exactly zero the population
/// standard deviation is substituted. For a perfectly constant window both
/// are zero and the returned spread is zero.
pub fn median_and_spread(values: &[f64]) -> Option<(f64, SpreadEstimate)> {
    let center = median(values)?;
    let mad = mad(values, center)?;
    if mad > 0.0 {
        return Some((
            center,
            SpreadEstimate {
                value: mad,
                source: SpreadSource::Mad,
            },
        ));
    }
    let std_dev = population_std_dev(values)?;
    Some((
        center,
        SpreadEstimate {
            value: std_dev,
            source: SpreadSource::StdDev,
        },
    ))
}

/// Percentile from a sorted slice using linear interpolation between ranks.
///
/// `p` is a fraction in `[0, 1]`. Returns 0.0 for an empty slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let p = p.clamp(0.0, 1.0);
    let idx = p * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = idx - lo as f64;
    // Exact when both ranks hold the same value.
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Percentile of unsorted values (see [`percentile_sorted`]).
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(percentile_sorted(&sorted, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn mad_is_unscaled() {
        // deviations from 3: [2, 1, 0, 1, 2] -> median 1
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(mad(&values, 3.0), Some(1.0));
    }

    #[test]
    fn population_std_dev_matches_hand_computation() {
        let values = [10.0, 10.0, 10.0, 10.0, 50.0];
        // mean 18, squared deviations 64*4 + 1024 = 1280, /5 = 256
        assert!((population_std_dev(&values).unwrap() - 16.0).abs() < 1e-12);
    }

    #[test]
    fn spread_falls_back_to_std_dev_when_mad_is_zero() {
        let values = [10.0, 10.0, 10.0, 10.0, 50.0];
        let (center, spread) = median_and_spread(&values).unwrap();
        assert_eq!(center, 10.0);
        assert_eq!(spread.source, SpreadSource::StdDev);
        assert!((spread.value - 16.0).abs() < 1e-12);
    }

    #[test]
    fn constant_window_has_zero_spread() {
        let (center, spread) = median_and_spread(&[7.0; 12]).unwrap();
        assert_eq!(center, 7.0);
        assert_eq!(spread.value, 0.0);
        assert_eq!(spread.source, SpreadSource::StdDev);
    }

    #[test]
    fn spread_prefers_mad() {
        let (_, spread) = median_and_spread(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(spread.source, SpreadSource::Mad);
        assert_eq!(spread.value, 1.0);
    }

    #[test]
    fn percentile_interpolates() {
        let sorted = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile_sorted(&sorted, 0.0), 0.0);
        assert_eq!(percentile_sorted(&sorted, 1.0), 40.0);
        assert!((percentile_sorted(&sorted, 0.1) - 4.0).abs() < 1e-12);
        assert_eq!(percentile(&[30.0, 0.0, 20.0, 10.0, 40.0], 0.5), Some(20.0));
    }

    #[test]
    fn empty_input_is_none() {
        assert!(mean(&[]).is_none());
        assert!(population_std_dev(&[]).is_none());
        assert!(median_and_spread(&[]).is_none());
        assert!(percentile(&[], 0.5).is_none());
    }
}
