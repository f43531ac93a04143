//! Property-based tests for detector invariants.
//!
//! Uses proptest to drive the robust and ensemble detectors with random
//! histories and check the scoring contract on every result.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use ta_common::Sample;
use ta_config::{DetectorConfig, StrategyKind};
use ta_core::detect::{build_detector, estimate_baseline, score_against, AnomalyDetector};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
}

fn series(values: &[f64]) -> Vec<Sample> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| Sample::new(t0() + Duration::minutes(i as i64), v))
        .collect()
}

/// Reference median, written independently of the library.
fn reference_median(values: &[f64]) -> f64 {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        0.5 * (v[n / 2 - 1] + v[n / 2])
    }
}

/// Integer-valued intensities keep medians of pairs exact.
fn history_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((0u32..2_000).prop_map(f64::from), 1..300)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn baseline_spread_matches_reference_mad(values in history_strategy()) {
        let baseline = estimate_baseline(&series(&values)).unwrap();
        let center = reference_median(&values);
        let deviations: Vec<f64> = values.iter().map(|x| (x - center).abs()).collect();
        let reference = reference_median(&deviations);

        prop_assert_eq!(baseline.median, center);
        prop_assert_eq!(baseline.sample_count, values.len());
        if reference > 0.0 {
            prop_assert_eq!(baseline.spread, reference);
        } else {
            prop_assert!(baseline.spread >= 0.0);
        }
    }

    #[test]
    fn verdict_is_strict_and_confidence_bounded(
        values in history_strategy(),
        intensity in 0.0..5_000.0f64,
        threshold in 0.5..6.0f64,
    ) {
        let baseline = estimate_baseline(&series(&values)).unwrap();
        if let Some(verdict) = score_against(&baseline, intensity, threshold) {
            prop_assert!(verdict.score >= 0.0);
            prop_assert_eq!(verdict.is_anomaly, verdict.score > threshold);
            prop_assert!((0.0..=1.0).contains(&verdict.confidence));
            prop_assert_eq!(verdict.confidence, (verdict.score / threshold).min(1.0));
        } else {
            prop_assert_eq!(baseline.spread, 0.0);
        }
    }

    #[test]
    fn robust_batch_preserves_input_order(
        history in history_strategy(),
        batch in prop::collection::vec(0.0..5_000.0f64, 0..100),
    ) {
        let mut detector = build_detector(&DetectorConfig::default());
        detector.load_history(&series(&history)).unwrap();

        let start = t0() + Duration::minutes(history.len() as i64);
        let samples: Vec<Sample> = batch
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(start + Duration::minutes(i as i64), v))
            .collect();
        let scored = detector.process_batch(&samples, None);

        if scored.is_empty() {
            prop_assert!(samples.is_empty() || detector.statistics_at(start).baseline_spread == Some(0.0));
        } else {
            prop_assert_eq!(scored.len(), samples.len());
            for (point, sample) in scored.iter().zip(&samples) {
                prop_assert_eq!(point.timestamp, sample.timestamp);
                prop_assert_eq!(point.intensity, sample.intensity);
            }
        }
        prop_assert_eq!(detector.history().len(), scored.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn ensemble_batch_scores_span_unit_interval(
        history in prop::collection::vec(0.0..1_000.0f64, 20..120),
        seed in any::<u64>(),
    ) {
        let config = DetectorConfig {
            n_estimators: 25,
            seed,
            ..DetectorConfig::default().with_strategy(StrategyKind::Ensemble)
        };
        let mut detector = build_detector(&config);
        let samples = series(&history);
        detector.load_history(&samples).unwrap();
        let scored = detector.process_batch(&samples, None);

        prop_assert_eq!(scored.len(), samples.len());
        prop_assert!(scored.iter().all(|p| (0.0..=1.0).contains(&p.score)));
        prop_assert!(scored.iter().all(|p| p.score == p.confidence));
        for (point, sample) in scored.iter().zip(&samples) {
            prop_assert_eq!(point.timestamp, sample.timestamp);
        }
    }
}
