//! Forecasting: engine boundary, additive model, training and prediction

pub mod additive;
pub mod engine;
pub mod features;
pub mod frame;
pub mod table;
pub mod train;
pub mod uncertainty;

pub use additive::{AdditiveEngine, AdditiveModel, ModelSettings, SeasonalityMode};
pub use engine::{FittedModel, ForecastEngine, ModelError, MAX_FUTURE_PERIODS};
pub use frame::TrainingFrame;
pub use table::{Components, ForecastPoint, ForecastTable, SeasonalTerm, FORECAST_COLUMNS};
pub use train::{forecast_components, make_forecast, train_model, TrainedModel};
