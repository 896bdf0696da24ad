//! Application configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! tickers = ["AAPL", "GOOG", "MSFT", "GME"]
//! start = "2015-01-01"
//! default_years = 1
//!
//! [provider]
//! kind = "yahoo"
//! grouped_header = true
//!
//! [model]
//! interval_width = 0.8
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stockcast_core::data::{CircuitBreaker, CsvProvider, DataProvider, YahooProvider, YahooSettings};
use stockcast_core::forecast::ModelSettings;
use thiserror::Error;

/// Forecast horizons offered, in years.
pub const MIN_YEARS: u32 = 1;
pub const MAX_YEARS: u32 = 4;
pub const DAYS_PER_YEAR: usize = 365;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("forecast horizon must be 1-4 years, got {0}")]
    Horizon(u32),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("provider setup failed: {0}")]
    Provider(String),
}

/// Market-data source selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    Yahoo {
        #[serde(default = "default_true")]
        grouped_header: bool,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        #[serde(default = "default_max_retries")]
        max_retries: u32,
    },
    Csv {
        dir: PathBuf,
    },
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Yahoo {
            grouped_header: true,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl ProviderConfig {
    pub fn build(&self) -> Result<Box<dyn DataProvider>, ConfigError> {
        match self {
            ProviderConfig::Yahoo {
                grouped_header,
                timeout_secs,
                max_retries,
            } => {
                let settings = YahooSettings {
                    timeout: Duration::from_secs(*timeout_secs),
                    max_retries: *max_retries,
                    grouped_header: *grouped_header,
                    ..YahooSettings::default()
                };
                let provider =
                    YahooProvider::new(Arc::new(CircuitBreaker::default_provider()), settings)
                        .map_err(|e| ConfigError::Provider(e.to_string()))?;
                Ok(Box::new(provider))
            }
            ProviderConfig::Csv { dir } => Ok(Box::new(CsvProvider::new(dir.clone()))),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tickers: Vec<String>,
    /// First day requested (inclusive).
    pub start: NaiveDate,
    /// Day the request stops (exclusive). Today when unset.
    pub end: Option<NaiveDate>,
    pub default_years: u32,
    pub provider: ProviderConfig,
    pub model: ModelSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tickers: ["AAPL", "GOOG", "MSFT", "GME"].map(String::from).to_vec(),
            start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            end: None,
            default_years: 1,
            provider: ProviderConfig::default(),
            model: ModelSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tickers.is_empty() {
            return Err(ConfigError::Invalid("tickers must not be empty".into()));
        }
        if let Some(bad) = self.tickers.iter().find(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("blank ticker {bad:?}")));
        }
        if let Some(end) = self.end {
            if end <= self.start {
                return Err(ConfigError::Invalid(format!(
                    "end {end} must be after start {}",
                    self.start
                )));
            }
        }
        horizon_days(self.default_years)?;
        self.model
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("model: {e}")))?;
        Ok(())
    }

    /// Requested range `[start, end)`, with `today` standing in for an unset end.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (self.start, self.end.unwrap_or(today))
    }
}

/// Horizon in days for a number of years.
pub fn horizon_days(years: u32) -> Result<usize, ConfigError> {
    if (MIN_YEARS..=MAX_YEARS).contains(&years) {
        Ok(years as usize * DAYS_PER_YEAR)
    } else {
        Err(ConfigError::Horizon(years))
    }
}
