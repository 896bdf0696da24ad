//! Forecasting engine boundary.
//!
//! The pipeline only ever talks to a model through these traits: an engine
//! fits a `TrainingFrame` and yields a read-only fitted model, which can
//! extend its timeline and predict over any set of dates.

use super::frame::TrainingFrame;
use super::table::{Components, ForecastTable};
use chrono::{Days, NaiveDate};
use thiserror::Error;

/// Errors raised while fitting or predicting.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("insufficient data: need at least 2 rows, got {rows}")]
    InsufficientData { rows: usize },

    #[error("history must contain at least 2 distinct dates")]
    DegenerateTimeline,

    #[error("cannot predict over an empty timeline")]
    EmptyTimeline,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// Longest future extension `make_future_timeline` accepts, in days.
pub const MAX_FUTURE_PERIODS: usize = 36_525;

/// Something that can fit a forecasting model.
pub trait ForecastEngine {
    type Model: FittedModel;

    fn name(&self) -> &str;

    /// Fit in one shot. The frame is already sorted with no missing values.
    fn fit(&self, frame: &TrainingFrame) -> Result<Self::Model, ModelError>;
}

/// A fitted, read-only forecasting model.
pub trait FittedModel: Send + Sync {
    /// Unique training dates, ascending.
    fn history_dates(&self) -> &[NaiveDate];

    /// History followed by `periods` consecutive calendar days after the last observed date.
    ///
    /// Fails rather than returning a shorter timeline when `periods` exceeds
    /// [`MAX_FUTURE_PERIODS`] or the calendar runs out.
    fn make_future_timeline(&self, periods: usize) -> Result<Vec<NaiveDate>, ModelError> {
        if periods > MAX_FUTURE_PERIODS {
            return Err(ModelError::InvalidInput(format!(
                "horizon of {periods} days exceeds the {MAX_FUTURE_PERIODS}-day limit"
            )));
        }
        let history = self.history_dates();
        let mut timeline = Vec::with_capacity(history.len().saturating_add(periods));
        timeline.extend_from_slice(history);
        if let Some(&last) = history.last() {
            for i in 1..=periods as u64 {
                let date = last.checked_add_days(Days::new(i)).ok_or_else(|| {
                    ModelError::InvalidInput(format!("date overflow {i} days after {last}"))
                })?;
                timeline.push(date);
            }
        }
        Ok(timeline)
    }

    /// Point estimates, components and uncertainty bounds for every date.
    fn predict(&self, timeline: &[NaiveDate]) -> Result<ForecastTable, ModelError>;

    /// Trend and seasonal decomposition for every date.
    fn components(&self, timeline: &[NaiveDate]) -> Result<Components, ModelError>;
}
