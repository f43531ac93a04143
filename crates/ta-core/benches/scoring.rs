//! Criterion benchmarks for detector scoring in `ta-core`.
//!
//! Per-point robust scoring should stay flat as the history grows; the
//! ensemble fit and batch scoring are tracked at a few history sizes.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ta_common::Sample;
use ta_config::{DetectorConfig, StrategyKind};
use ta_core::detect::{build_detector, score_against, AnomalyDetector, RobustDetector};

fn synthetic_history(n: usize) -> Vec<Sample> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut state: u64 = 11;
    (0..n)
        .map(|i| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let noise = (state >> 33) as f64 / (1u64 << 31) as f64;
            Sample::new(start + Duration::minutes(i as i64), 400.0 + noise * 80.0)
        })
        .collect()
}

/// The scoring core plus the buffer append that `process_point` performs;
/// the score log is left out so memory stays flat across iterations.
fn bench_robust_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("robust/score_point");
    for days in [1usize, 7, 30] {
        let history = synthetic_history(days * 1440);
        let mut detector = RobustDetector::from_config(&DetectorConfig::default());
        detector.load_history(&history).unwrap();
        let baseline = *detector.baseline().unwrap();
        let mut buffer = detector.buffer().clone();
        group.bench_with_input(BenchmarkId::from_parameter(days), &455.0, |b, &x| {
            b.iter(|| {
                buffer.push(black_box(x));
                black_box(score_against(&baseline, black_box(x), 3.5))
            });
        });
    }
    group.finish();
}

fn bench_ensemble(c: &mut Criterion) {
    let config = DetectorConfig::default().with_strategy(StrategyKind::Ensemble);
    let mut group = c.benchmark_group("ensemble");
    group.sample_size(20);
    for n in [1_000usize, 10_000] {
        let history = synthetic_history(n);
        group.bench_with_input(BenchmarkId::new("fit", n), &history, |b, h| {
            b.iter(|| {
                let mut detector = build_detector(&config);
                black_box(detector.load_history(black_box(h)).unwrap());
            });
        });

        let mut detector = build_detector(&config);
        detector.load_history(&history).unwrap();
        group.bench_with_input(BenchmarkId::new("batch", n), &history, |b, h| {
            b.iter(|| black_box(detector.process_batch(black_box(h), None).len()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_robust_point, bench_ensemble);
criterion_main!(benches);
