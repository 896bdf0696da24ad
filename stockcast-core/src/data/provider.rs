//! Market-data provider trait and provider-level error types.
//!
//! The DataProvider trait abstracts over data sources (Yahoo Finance, CSV
//! exports) so the loader can swap implementations and tests can mock them.
//! Providers return the raw, possibly grouped table exactly as the source
//! shapes it; cleaning happens above this trait.

use super::raw::RawSeries;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by a provider while retrieving a raw series.
///
/// These never reach callers of `load_data` directly: the loader folds them
/// into `Error::DataLoad` together with the ticker.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("provider error: {0}")]
    Other(String),
}

/// Trait for market-data providers.
///
/// `fetch` covers the half-open range `[start, end)`. An unknown ticker or a
/// range without trading days is not an error: the provider returns an empty
/// `RawSeries` and the loader decides what that means.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily rows for a ticker over `[start, end)`.
    fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate)
        -> Result<RawSeries, ProviderError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, ProviderError> {
        (**self).fetch(ticker, start, end)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
