//! Criterion benchmarks for the engine's hot paths.
//!
//! Benchmarks:
//! 1. Asset advance (one base candle through every scheme)
//! 2. Triad snapshot (SMT + PSP detection over all outstanding boundaries)
//! 3. Targets and true opens
//! 4. Backward reconstruction of one asset

use chrono::{DateTime, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use triad_core::domain::base_step;
use triad_core::{Asset, Candle, Triad};

// ── Helpers ──────────────────────────────────────────────────────────

fn start() -> DateTime<Utc> {
    Candle::parse_minute("2023-01-02 00:00").unwrap()
}

fn make_candles(n: usize, phase: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let x = i as f64 + phase;
            let close = 100.0 + (x * 0.01).sin() * 10.0 + (x * 0.3).sin();
            let open = close - 0.3 * (x * 0.7).cos();
            Candle::new(
                start() + base_step() * i as i32,
                open,
                open.max(close) + 0.5,
                open.min(close) - 0.5,
                close,
                1_000.0,
            )
        })
        .collect()
}

fn make_triad(days: usize) -> Triad {
    let series = [
        make_candles(96 * days, 0.0),
        make_candles(96 * days, 40.0),
        make_candles(96 * days, 95.0),
    ];
    let mut triad = Triad::empty(["A", "B", "C"]);
    for i in 0..series[0].len() {
        triad
            .advance([series[0][i], series[1][i], series[2][i]])
            .unwrap();
    }
    triad
}

// ── 1. Advance ───────────────────────────────────────────────────────

fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("asset_advance");
    for days in [7usize, 90] {
        let candles = make_candles(96 * days, 0.0);
        group.bench_with_input(BenchmarkId::from_parameter(days), &candles, |b, candles| {
            b.iter(|| {
                let mut asset = Asset::new("A");
                for c in candles {
                    asset.advance(*c).unwrap();
                }
                black_box(asset.cursor())
            })
        });
    }
    group.finish();
}

// ── 2. Snapshot ──────────────────────────────────────────────────────

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("triad_snapshot");
    for days in [14usize, 60] {
        let triad = make_triad(days);
        group.bench_with_input(BenchmarkId::from_parameter(days), &triad, |b, triad| {
            b.iter(|| black_box(triad.snapshot().len()))
        });
    }
    group.finish();
}

// ── 3. Targets ───────────────────────────────────────────────────────

fn bench_targets(c: &mut Criterion) {
    let triad = make_triad(30);
    c.bench_function("triad_targets_and_true_opens", |b| {
        b.iter(|| {
            let long = triad.long_targets();
            let short = triad.short_targets();
            let opens = triad.true_opens();
            black_box((long.len(), short.len(), opens.assets.len()))
        })
    });
}

// ── 4. Reconstruct ───────────────────────────────────────────────────

fn bench_reconstruct(c: &mut Criterion) {
    // Two trading years so the previous year is fully covered.
    let candles = make_candles(96 * 730, 0.0);
    c.bench_function("asset_reconstruct_two_years", |b| {
        b.iter(|| {
            let asset = Asset::reconstruct("A", candles.iter().rev().copied()).unwrap();
            black_box(asset.candles().len())
        })
    });
}

criterion_group!(
    benches,
    bench_advance,
    bench_snapshot,
    bench_targets,
    bench_reconstruct
);
criterion_main!(benches);
