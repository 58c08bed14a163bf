//! Criterion benchmarks for the reconciliation hot paths.
//!
//! Benchmarks:
//! 1. Alignment of ragged multi-year series
//! 2. Pairwise correlation over the resulting return table

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cryptoa_core::analytics::pairwise_correlate;
use cryptoa_core::data::{align_series, PricePoint, PriceSeries, ReturnTable};

/// Deterministic random walk with every `gap`-th day missing.
fn synthetic_series(symbol: &str, days: i64, gap: i64, seed: u64) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut state = seed;
    let mut price = 100.0;
    let points = (0..days).filter(|d| gap == 0 || d % gap != 0).map(|d| {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let step = ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
        price *= 1.0 + step * 0.04;
        PricePoint::new(start + chrono::Duration::days(d), price)
    });
    PriceSeries::new(symbol, points.collect::<Vec<_>>())
}

fn universe(symbols: usize, days: i64) -> Vec<PriceSeries> {
    (0..symbols)
        .map(|i| synthetic_series(&format!("S{i}"), days, (i as i64 % 5) + 2, i as u64 + 1))
        .collect()
}

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align");
    for symbols in [2, 7, 20] {
        let input = universe(symbols, 365 * 4);
        group.bench_with_input(BenchmarkId::from_parameter(symbols), &input, |b, input| {
            b.iter(|| align_series(black_box(input)))
        });
    }
    group.finish();
}

fn bench_correlate(c: &mut Criterion) {
    let mut group = c.benchmark_group("pairwise_correlate");
    for symbols in [2, 7, 20] {
        let table = align_series(&universe(symbols, 365 * 4));
        let returns = ReturnTable::from_prices(&table);
        group.bench_with_input(BenchmarkId::from_parameter(symbols), &returns, |b, returns| {
            b.iter(|| pairwise_correlate(black_box(returns)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_align, bench_correlate);
criterion_main!(benches);
