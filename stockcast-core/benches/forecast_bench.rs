//! Criterion benchmarks for the forecasting hot paths.
//!
//! Benchmarks:
//! 1. Cleaning a grouped raw series
//! 2. Fitting the additive model (history lengths matching 1, 5 and 10 years)
//! 3. Predicting with uncertainty over a 4-year horizon

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polars::prelude::*;
use stockcast_core::data::canonicalize::date_column;
use stockcast_core::data::raw::{ColumnKey, RawColumn, INDEX_NAME};
use stockcast_core::data::{CanonicalSeries, Canonicalizer};
use stockcast_core::forecast::{AdditiveEngine, FittedModel, ForecastEngine, TrainingFrame};
use stockcast_core::RawSeries;

// ── Helpers ──────────────────────────────────────────────────────────

fn trading_days(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    (0..)
        .map(|i| start + Days::new(i))
        .filter(|d| chrono::Datelike::weekday(d).number_from_monday() <= 5)
        .take(n)
        .collect()
}

fn make_raw(n: usize) -> RawSeries {
    let dates: Vec<Option<NaiveDate>> = trading_days(n).into_iter().map(Some).collect();
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + i as f64 * 0.05 + (i as f64 * 0.1).sin() * 10.0)
        .collect();
    let opens: Vec<f64> = closes.iter().map(|c| c - 0.3).collect();
    RawSeries::new(
        date_column(INDEX_NAME, &dates).unwrap(),
        vec![
            RawColumn::new(
                ColumnKey::grouped("Close", "BENCH"),
                Column::new("Close".into(), closes),
            ),
            RawColumn::new(
                ColumnKey::grouped("Open", "BENCH"),
                Column::new("Open".into(), opens),
            ),
        ],
    )
    .unwrap()
}

fn make_series(n: usize) -> CanonicalSeries {
    Canonicalizer::clean("BENCH", make_raw(n)).unwrap()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_clean(c: &mut Criterion) {
    let raw = make_raw(2520);
    c.bench_function("clean_grouped_2520", |b| {
        b.iter(|| Canonicalizer::clean("BENCH", black_box(raw.clone())).unwrap())
    });
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_additive");
    let engine = AdditiveEngine::default();
    for n in [252usize, 1260, 2520] {
        let frame = TrainingFrame::from_series(&make_series(n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &frame, |b, frame| {
            b.iter(|| engine.fit(black_box(frame)).unwrap())
        });
    }
    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let frame = TrainingFrame::from_series(&make_series(1260));
    let model = AdditiveEngine::default().fit(&frame).unwrap();
    let timeline = model.make_future_timeline(1460).unwrap();
    c.bench_function("predict_1260_plus_1460", |b| {
        b.iter(|| model.predict(black_box(&timeline)).unwrap())
    });
}

criterion_group!(benches, bench_clean, bench_fit, bench_predict);
criterion_main!(benches);
