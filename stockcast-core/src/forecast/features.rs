//! Regressor construction for the additive model.

use crate::data::canonicalize::epoch_days;
use chrono::NaiveDate;
use std::f64::consts::PI;

/// A Fourier seasonality: `order` sine/cosine pairs of the given period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seasonality {
    pub name: &'static str,
    pub period_days: f64,
    pub order: usize,
}

impl Seasonality {
    pub const YEARLY: Seasonality = Seasonality {
        name: "yearly",
        period_days: 365.25,
        order: 10,
    };

    pub const WEEKLY: Seasonality = Seasonality {
        name: "weekly",
        period_days: 7.0,
        order: 3,
    };

    /// Number of regressors this seasonality contributes.
    pub fn width(&self) -> usize {
        2 * self.order
    }

    /// Append `sin, cos` pairs for each harmonic. Time is measured in days since 1970-01-01.
    pub fn push_features(&self, date: NaiveDate, out: &mut Vec<f64>) {
        let t = f64::from(epoch_days(date));
        for i in 1..=self.order {
            let x = 2.0 * PI * i as f64 * t / self.period_days;
            out.push(x.sin());
            out.push(x.cos());
        }
    }
}

/// Maps dates onto the model's time axis: 0 at the first observation, 1 at the last.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    start: NaiveDate,
    span_days: f64,
}

impl TimeScale {
    /// `None` when `last` is not after `start`.
    pub fn new(start: NaiveDate, last: NaiveDate) -> Option<Self> {
        let span = (last - start).num_days();
        (span > 0).then_some(Self {
            start,
            span_days: span as f64,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn span_days(&self) -> f64 {
        self.span_days
    }

    pub fn scale(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }
}

/// Changepoint locations on the scaled axis.
///
/// Uses the first `range` fraction of the history; at most `requested`
/// changepoints, and never more than `floor(range * n) - 1`. Locations are
/// observed dates picked at evenly spaced indices, excluding the first.
pub fn changepoints(history: &[f64], requested: usize, range: f64) -> Vec<f64> {
    let hist_size = (history.len() as f64 * range).floor() as usize;
    let count = requested.min(hist_size.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    let last = (hist_size - 1) as f64;
    (1..=count)
        .map(|i| {
            let idx = (last * i as f64 / count as f64).round() as usize;
            history[idx.min(history.len() - 1)]
        })
        .collect()
}

/// Piecewise-linear trend regressors: `[t, 1, (t - s_1)+, ..., (t - s_k)+]`.
pub fn push_trend_features(t: f64, changepoints: &[f64], out: &mut Vec<f64>) {
    out.push(t);
    out.push(1.0);
    out.extend(changepoints.iter().map(|&s| (t - s).max(0.0)));
}
