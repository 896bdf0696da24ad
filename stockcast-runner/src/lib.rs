//! Stockcast Runner: configuration, series memoization, forecast sessions, export.
//!
//! This crate builds on `stockcast-core` to provide:
//! - TOML configuration with provider selection and model settings
//! - A series cache keyed by `(ticker, start, end)` with an explicit clear
//! - Forecast sessions running load → train → forecast per interaction
//! - CSV, JSON and Markdown export of forecasts

pub mod cache;
pub mod config;
pub mod export;
pub mod session;

pub use cache::{CacheKey, CacheStats, SeriesCache};
pub use config::{horizon_days, AppConfig, ConfigError, ProviderConfig, MAX_YEARS, MIN_YEARS};
pub use export::{forecast_csv, save_artifacts, series_csv};
pub use session::{
    normalize_ticker, ForecastReport, ForecastSession, ReportSummary, SessionError,
};
