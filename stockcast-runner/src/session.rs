//! Forecast session: one user's interaction loop state.
//!
//! Owns the provider, the series cache, the engine and the configuration.
//! Each interaction runs load → train → forecast to completion; only the
//! cache survives between interactions.

use crate::cache::{CacheKey, CacheStats, SeriesCache};
use crate::config::{horizon_days, AppConfig, ConfigError};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use stockcast_core::data::DataProvider;
use stockcast_core::forecast::{
    forecast_components, AdditiveEngine, Components, ForecastEngine, ForecastTable,
};
use stockcast_core::{load_data, make_forecast, train_model, CanonicalSeries};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Pipeline(#[from] stockcast_core::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Canonical spelling of a ticker symbol: trimmed and upper-case.
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// Everything the presentation layer shows for one forecast.
#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub ticker: String,
    pub years: u32,
    pub horizon_days: usize,
    pub series: Arc<CanonicalSeries>,
    pub table: ForecastTable,
    pub components: Components,
}

/// Serializable one-line digest of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub ticker: String,
    pub years: u32,
    pub horizon_days: usize,
    pub history_rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub forecast_end: Option<NaiveDate>,
    pub yhat: Option<f64>,
    pub yhat_lower: Option<f64>,
    pub yhat_upper: Option<f64>,
}

impl ForecastReport {
    pub fn summary(&self) -> ReportSummary {
        let last = self.table.last();
        ReportSummary {
            ticker: self.ticker.clone(),
            years: self.years,
            horizon_days: self.horizon_days,
            history_rows: self.series.len(),
            first_date: self.series.first_date(),
            last_date: self.series.last_date(),
            forecast_end: last.map(|p| p.ds),
            yhat: last.map(|p| p.yhat),
            yhat_lower: last.map(|p| p.yhat_lower),
            yhat_upper: last.map(|p| p.yhat_upper),
        }
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} trading days", self.ticker, self.history_rows)?;
        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            write!(f, " ({first} to {last})")?;
        }
        write!(f, ", {}-year forecast", self.years)?;
        if let (Some(end), Some(yhat), Some(lo), Some(hi)) =
            (self.forecast_end, self.yhat, self.yhat_lower, self.yhat_upper)
        {
            write!(f, " to {end}: {yhat:.2} [{lo:.2}, {hi:.2}]")?;
        }
        Ok(())
    }
}

/// Session state.
pub struct ForecastSession<E: ForecastEngine = AdditiveEngine> {
    config: AppConfig,
    provider: Box<dyn DataProvider>,
    engine: E,
    cache: SeriesCache,
    today: NaiveDate,
}

impl ForecastSession<AdditiveEngine> {
    /// Build provider and engine from the configuration.
    pub fn from_config(config: AppConfig, today: NaiveDate) -> Result<Self, ConfigError> {
        config.validate()?;
        let provider = config.provider.build()?;
        let engine = AdditiveEngine::new(config.model.clone());
        Ok(Self::new(config, provider, engine, today))
    }
}

impl<E: ForecastEngine> ForecastSession<E> {
    pub fn new(
        config: AppConfig,
        provider: Box<dyn DataProvider>,
        engine: E,
        today: NaiveDate,
    ) -> Self {
        Self {
            config,
            provider,
            engine,
            cache: SeriesCache::new(),
            today,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn tickers(&self) -> &[String] {
        &self.config.tickers
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Requested range `[start, end)`.
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        self.config.range(self.today)
    }

    /// Memoized `load_data` over the configured range.
    ///
    /// `ticker` is normalized first, so `aapl` and `AAPL` share one entry.
    pub fn load(&mut self, ticker: &str) -> Result<Arc<CanonicalSeries>, SessionError> {
        let (start, end) = self.range();
        let provider = self.provider.as_ref();
        let key = CacheKey::new(normalize_ticker(ticker), start, end);
        let series = self
            .cache
            .get_or_load(key, |key| {
                load_data(provider, &key.ticker, key.start, key.end)
            })?;
        Ok(series)
    }

    /// Load, train and forecast `years` ahead.
    pub fn forecast(&mut self, ticker: &str, years: u32) -> Result<ForecastReport, SessionError> {
        let horizon = horizon_days(years)?;
        let ticker = normalize_ticker(ticker);
        let series = self.load(&ticker)?;

        let trained = train_model(&self.engine, &series)?;
        let table = make_forecast(&trained, horizon)?;
        let components = forecast_components(&trained, &table)?;

        info!(ticker = %ticker, years, rows = table.len(), "forecast ready");

        Ok(ForecastReport {
            ticker,
            years,
            horizon_days: horizon,
            series,
            table,
            components,
        })
    }

    /// Invalidate every cached series.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
