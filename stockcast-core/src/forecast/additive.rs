//! Decomposable additive forecasting model.
//!
//! `y(t) = trend(t) + weekly(t) + yearly(t) + noise`, where the trend is
//! piecewise linear with changepoints over the early part of the history and
//! each seasonality is a truncated Fourier series. Parameters are a MAP
//! estimate under Gaussian priors, which reduces to ridge-regularized least
//! squares on the design matrix.
//!
//! Defaults match the usual Prophet knobs: 25 changepoints over the first 80%
//! of history, changepoint prior 0.05, seasonality prior 10, 80% intervals
//! from 1000 simulated samples.

use super::engine::{FittedModel, ForecastEngine, ModelError};
use super::features::{changepoints, push_trend_features, Seasonality, TimeScale};
use super::frame::TrainingFrame;
use super::table::{Components, ForecastPoint, ForecastTable, SeasonalTerm};
use super::uncertainty::{interval, TrendPath};
use crate::rng::SeedHierarchy;
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prior standard deviation of the base growth rate and offset.
const BASE_PRIOR_SCALE: f64 = 5.0;
/// Floor on the observation noise variance, in scaled units.
const MIN_NOISE_VARIANCE: f64 = 1e-6;
const JITTER: f64 = 1e-10;

/// Whether a seasonality is fitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    /// Decided from the history span and sampling frequency.
    #[default]
    Auto,
    Enabled,
    Disabled,
}

/// Model knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub yearly_seasonality: SeasonalityMode,
    pub weekly_seasonality: SeasonalityMode,
    pub interval_width: f64,
    pub uncertainty_samples: usize,
    pub seed: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            yearly_seasonality: SeasonalityMode::Auto,
            weekly_seasonality: SeasonalityMode::Auto,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 0,
        }
    }
}

impl ModelSettings {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(ModelError::InvalidInput(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        if !(self.changepoint_prior_scale > 0.0 && self.changepoint_prior_scale.is_finite()) {
            return Err(ModelError::InvalidInput(
                "changepoint_prior_scale must be positive".into(),
            ));
        }
        if !(self.seasonality_prior_scale > 0.0 && self.seasonality_prior_scale.is_finite()) {
            return Err(ModelError::InvalidInput(
                "seasonality_prior_scale must be positive".into(),
            ));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(ModelError::InvalidInput(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        Ok(())
    }
}

/// Engine producing `AdditiveModel`s.
#[derive(Debug, Clone, Default)]
pub struct AdditiveEngine {
    settings: ModelSettings,
}

impl AdditiveEngine {
    pub fn new(settings: ModelSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    fn seasonalities(&self, history: &[NaiveDate], span_days: f64) -> Vec<Seasonality> {
        let min_spacing = history
            .windows(2)
            .map(|w| (w[1] - w[0]).num_days())
            .min()
            .unwrap_or(0);

        let mut enabled = Vec::new();
        if resolve(self.settings.yearly_seasonality, span_days >= 730.0) {
            enabled.push(Seasonality::YEARLY);
        }
        if resolve(
            self.settings.weekly_seasonality,
            span_days >= 14.0 && min_spacing < 7,
        ) {
            enabled.push(Seasonality::WEEKLY);
        }
        enabled
    }
}

fn resolve(mode: SeasonalityMode, auto: bool) -> bool {
    match mode {
        SeasonalityMode::Auto => auto,
        SeasonalityMode::Enabled => true,
        SeasonalityMode::Disabled => false,
    }
}

impl ForecastEngine for AdditiveEngine {
    type Model = AdditiveModel;

    fn name(&self) -> &str {
        "additive"
    }

    fn fit(&self, frame: &TrainingFrame) -> Result<AdditiveModel, ModelError> {
        self.settings.validate()?;

        if frame.len() < 2 {
            return Err(ModelError::InsufficientData { rows: frame.len() });
        }
        if let Some(bad) = frame.y().iter().find(|v| !v.is_finite()) {
            return Err(ModelError::InvalidInput(format!("non-finite observation {bad}")));
        }

        let history = frame.unique_dates();
        let (first, last) = match (history.first(), history.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(ModelError::DegenerateTimeline),
        };
        let scale = TimeScale::new(first, last).ok_or(ModelError::DegenerateTimeline)?;

        let y_max = frame.y().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_max > 0.0 { y_max } else { 1.0 };

        let t_history: Vec<f64> = history.iter().map(|&d| scale.scale(d)).collect();
        let design = Design {
            scale,
            changepoints: changepoints(
                &t_history,
                self.settings.n_changepoints,
                self.settings.changepoint_range,
            ),
            seasonalities: self.seasonalities(&history, scale.span_days()),
        };

        let x = design.matrix(frame.ds());
        let y = DVector::from_iterator(frame.len(), frame.y().iter().map(|v| v / y_scale));

        // Two passes: the first with a noise guess from successive differences,
        // the second with the residual variance of the first.
        let mut sigma2 = initial_noise_variance(y.as_slice());
        let mut beta = solve_ridge(&x, &y, &design.penalties(&self.settings, sigma2))?;
        sigma2 = residual_variance(&x, &y, &beta);
        beta = solve_ridge(&x, &y, &design.penalties(&self.settings, sigma2))?;
        sigma2 = residual_variance(&x, &y, &beta);

        let coefficients: Vec<f64> = beta.iter().copied().collect();
        let deltas = &coefficients[2..2 + design.changepoints.len()];
        let mut mean_abs_delta = 1e-8;
        if !deltas.is_empty() {
            mean_abs_delta += deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64;
        }

        let model = AdditiveModel {
            settings: self.settings.clone(),
            history,
            design,
            y_scale,
            coefficients,
            sigma: sigma2.sqrt(),
            mean_abs_delta,
        };

        debug!(
            rows = frame.len(),
            changepoints = model.design.changepoints.len(),
            seasonalities = ?model.seasonality_names(),
            sigma = model.noise_sigma(),
            "fitted additive model"
        );

        Ok(model)
    }
}

/// Regressor layout: `[k, m, delta_1..delta_c, seasonal...]`.
#[derive(Debug, Clone)]
struct Design {
    scale: TimeScale,
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
}

impl Design {
    fn trend_width(&self) -> usize {
        2 + self.changepoints.len()
    }

    fn width(&self) -> usize {
        self.trend_width() + self.seasonalities.iter().map(Seasonality::width).sum::<usize>()
    }

    fn row(&self, date: NaiveDate, out: &mut Vec<f64>) {
        push_trend_features(self.scale.scale(date), &self.changepoints, out);
        for s in &self.seasonalities {
            s.push_features(date, out);
        }
    }

    fn matrix(&self, dates: &[NaiveDate]) -> DMatrix<f64> {
        let mut data = Vec::with_capacity(dates.len() * self.width());
        for &date in dates {
            self.row(date, &mut data);
        }
        DMatrix::from_row_slice(dates.len(), self.width(), &data)
    }

    /// Ridge penalties `sigma^2 / prior_variance` for each coefficient.
    ///
    /// The Laplace changepoint prior is replaced by a Gaussian of equal variance.
    fn penalties(&self, settings: &ModelSettings, sigma2: f64) -> Vec<f64> {
        let base = sigma2 / BASE_PRIOR_SCALE.powi(2);
        let delta = sigma2 / (2.0 * settings.changepoint_prior_scale.powi(2));
        let seasonal = sigma2 / settings.seasonality_prior_scale.powi(2);

        let mut penalties = vec![base, base];
        penalties.extend(std::iter::repeat(delta).take(self.changepoints.len()));
        penalties.extend(std::iter::repeat(seasonal).take(self.width() - self.trend_width()));
        penalties
    }
}

fn initial_noise_variance(y: &[f64]) -> f64 {
    let diffs: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
    if diffs.is_empty() {
        return MIN_NOISE_VARIANCE;
    }
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let var = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / diffs.len() as f64;
    (var / 2.0).max(MIN_NOISE_VARIANCE)
}

fn residual_variance(x: &DMatrix<f64>, y: &DVector<f64>, beta: &DVector<f64>) -> f64 {
    let residuals = y - x * beta;
    (residuals.norm_squared() / y.len() as f64).max(MIN_NOISE_VARIANCE)
}

fn solve_ridge(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    penalties: &[f64],
) -> Result<DVector<f64>, ModelError> {
    let xt = x.transpose();
    let mut a = &xt * x;
    for (i, p) in penalties.iter().enumerate() {
        a[(i, i)] += p + JITTER;
    }
    let b = &xt * y;

    let beta = match a.clone().cholesky() {
        Some(chol) => chol.solve(&b),
        None => a
            .lu()
            .solve(&b)
            .ok_or_else(|| ModelError::Numerical("normal equations are singular".into()))?,
    };

    if beta.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::Numerical("non-finite coefficients".into()));
    }
    Ok(beta)
}

/// Point decomposition at one date, in scaled units.
struct Decomposition {
    t: f64,
    trend: f64,
    seasonal: Vec<f64>,
}

impl Decomposition {
    fn additive(&self) -> f64 {
        self.seasonal.iter().sum()
    }
}

/// A fitted additive model.
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    settings: ModelSettings,
    history: Vec<NaiveDate>,
    design: Design,
    y_scale: f64,
    coefficients: Vec<f64>,
    sigma: f64,
    mean_abs_delta: f64,
}

impl AdditiveModel {
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Changepoint dates, ascending.
    pub fn changepoint_dates(&self) -> Vec<NaiveDate> {
        let t: Vec<f64> = self.history.iter().map(|&d| self.design.scale.scale(d)).collect();
        self.design
            .changepoints
            .iter()
            .filter_map(|s| t.iter().position(|v| v == s).map(|i| self.history[i]))
            .collect()
    }

    pub fn seasonality_names(&self) -> Vec<&'static str> {
        self.design.seasonalities.iter().map(|s| s.name).collect()
    }

    /// Observation noise standard deviation, in price units.
    pub fn noise_sigma(&self) -> f64 {
        self.sigma * self.y_scale
    }

    fn decompose(&self, date: NaiveDate, row: &mut Vec<f64>) -> Decomposition {
        row.clear();
        self.design.row(date, row);

        let trend_width = self.design.trend_width();
        let dot = |range: std::ops::Range<usize>| -> f64 {
            row[range.clone()]
                .iter()
                .zip(&self.coefficients[range])
                .map(|(x, b)| x * b)
                .sum()
        };

        let trend = dot(0..trend_width);
        let mut offset = trend_width;
        let seasonal = self
            .design
            .seasonalities
            .iter()
            .map(|s| {
                let value = dot(offset..offset + s.width());
                offset += s.width();
                value
            })
            .collect();

        Decomposition {
            t: row[0],
            trend,
            seasonal,
        }
    }

    fn seasonal_value(&self, d: &Decomposition, name: &str) -> f64 {
        self.design
            .seasonalities
            .iter()
            .position(|s| s.name == name)
            .map(|i| d.seasonal[i] * self.y_scale)
            .unwrap_or(0.0)
    }
}

impl FittedModel for AdditiveModel {
    fn history_dates(&self) -> &[NaiveDate] {
        &self.history
    }

    fn predict(&self, timeline: &[NaiveDate]) -> Result<ForecastTable, ModelError> {
        if timeline.is_empty() {
            return Err(ModelError::EmptyTimeline);
        }

        let mut row = Vec::with_capacity(self.design.width());
        let points: Vec<Decomposition> = timeline
            .iter()
            .map(|&d| self.decompose(d, &mut row))
            .collect();

        let samples = self.settings.uncertainty_samples;
        let t_max = points.iter().map(|p| p.t).fold(f64::MIN, f64::max);
        let seeds = SeedHierarchy::new(self.settings.seed);
        let paths: Vec<TrendPath> = (0..samples as u64)
            .map(|i| {
                TrendPath::sample(
                    &mut seeds.rng_for("trend", i),
                    self.design.changepoints.len(),
                    self.mean_abs_delta,
                    t_max,
                )
            })
            .collect();
        let mut noise = seeds.rng_for("noise", 0);

        let width = self.settings.interval_width;
        let mut trend_draws = vec![0.0; samples];
        let mut yhat_draws = vec![0.0; samples];
        let mut rows = Vec::with_capacity(timeline.len());

        for (&ds, p) in timeline.iter().zip(&points) {
            let additive = p.additive();
            let trend = p.trend * self.y_scale;
            let yhat = (p.trend + additive) * self.y_scale;

            let (trend_bounds, yhat_bounds) = if samples == 0 {
                ((trend, trend), (yhat, yhat))
            } else {
                for (i, path) in paths.iter().enumerate() {
                    let z: f64 = StandardNormal.sample(&mut noise);
                    let sampled_trend = p.trend + path.offset(p.t);
                    trend_draws[i] = sampled_trend * self.y_scale;
                    yhat_draws[i] = (sampled_trend + additive + self.sigma * z) * self.y_scale;
                }
                (
                    interval(&mut trend_draws, width),
                    interval(&mut yhat_draws, width),
                )
            };

            rows.push(ForecastPoint {
                ds,
                trend,
                yhat_lower: yhat_bounds.0.min(yhat),
                yhat_upper: yhat_bounds.1.max(yhat),
                trend_lower: trend_bounds.0.min(trend),
                trend_upper: trend_bounds.1.max(trend),
                additive_terms: additive * self.y_scale,
                weekly: self.seasonal_value(p, Seasonality::WEEKLY.name),
                yearly: self.seasonal_value(p, Seasonality::YEARLY.name),
                yhat,
            });
        }

        Ok(ForecastTable::new(rows))
    }

    fn components(&self, timeline: &[NaiveDate]) -> Result<Components, ModelError> {
        if timeline.is_empty() {
            return Err(ModelError::EmptyTimeline);
        }

        let mut row = Vec::with_capacity(self.design.width());
        let points: Vec<Decomposition> = timeline
            .iter()
            .map(|&d| self.decompose(d, &mut row))
            .collect();

        let seasonal = self
            .design
            .seasonalities
            .iter()
            .enumerate()
            .map(|(i, s)| SeasonalTerm {
                name: s.name.to_string(),
                period_days: s.period_days,
                values: points.iter().map(|p| p.seasonal[i] * self.y_scale).collect(),
            })
            .collect();

        Ok(Components {
            ds: timeline.to_vec(),
            trend: points.iter().map(|p| p.trend * self.y_scale).collect(),
            seasonal,
        })
    }
}
