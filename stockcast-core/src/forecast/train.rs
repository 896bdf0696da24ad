//! `train_model` and `make_forecast`: the pipeline's entry points into an engine.

use super::engine::{FittedModel, ForecastEngine};
use super::frame::TrainingFrame;
use super::table::{Components, ForecastTable};
use crate::data::CanonicalSeries;
use crate::error::Error;
use tracing::{error, info};

/// A fitted model together with the ticker it was trained on.
#[derive(Debug, Clone)]
pub struct TrainedModel<M> {
    ticker: String,
    model: M,
}

impl<M: FittedModel> TrainedModel<M> {
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn history_len(&self) -> usize {
        self.model.history_dates().len()
    }
}

/// Fit `engine` on the `(ds, y)` projection of a canonical series.
pub fn train_model<E: ForecastEngine>(
    engine: &E,
    series: &CanonicalSeries,
) -> Result<TrainedModel<E::Model>, Error> {
    let frame = TrainingFrame::from_series(series);
    let ticker = series.ticker();

    let model = engine.fit(&frame).map_err(|source| {
        error!(ticker, engine = engine.name(), rows = frame.len(), error = %source, "training failed");
        Error::Train {
            ticker: ticker.to_string(),
            source,
        }
    })?;

    info!(
        ticker,
        engine = engine.name(),
        rows = frame.len(),
        history = model.history_dates().len(),
        "model trained"
    );

    Ok(TrainedModel {
        ticker: ticker.to_string(),
        model,
    })
}

/// Predict over the history plus `horizon` days after the last observation.
///
/// The first rows line up one-to-one with the model's history dates.
pub fn make_forecast<M: FittedModel>(
    trained: &TrainedModel<M>,
    horizon: usize,
) -> Result<ForecastTable, Error> {
    let table = trained
        .model
        .make_future_timeline(horizon)
        .and_then(|timeline| trained.model.predict(&timeline))
        .map_err(|source| {
            error!(ticker = %trained.ticker, horizon, error = %source, "forecast failed");
            Error::Forecast {
                ticker: trained.ticker.clone(),
                source,
            }
        })?;

    info!(
        ticker = %trained.ticker,
        horizon,
        rows = table.len(),
        "forecast generated"
    );
    Ok(table)
}

/// Trend and seasonal decomposition over the dates of a forecast table.
pub fn forecast_components<M: FittedModel>(
    trained: &TrainedModel<M>,
    table: &ForecastTable,
) -> Result<Components, Error> {
    trained
        .model
        .components(&table.dates())
        .map_err(|source| Error::Forecast {
            ticker: trained.ticker.clone(),
            source,
        })
}
