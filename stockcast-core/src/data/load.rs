//! `load_data`: fetch → clean, with one error policy at the boundary.

use super::canonicalize::{CleanError, Canonicalizer};
use super::provider::DataProvider;
use super::series::CanonicalSeries;
use crate::error::{EmptyStage, Error};
use chrono::NaiveDate;
use tracing::{debug, error};

/// Fetch and clean the daily series for `ticker` over `[start, end)`.
///
/// Callers only ever see `Error::EmptyResult` or `Error::DataLoad`. The
/// function holds no state: memoization belongs to whoever calls it.
pub fn load_data(
    provider: &dyn DataProvider,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<CanonicalSeries, Error> {
    let result = fetch_and_clean(provider, ticker, start, end);
    if let Err(err) = &result {
        error!(ticker, provider = provider.name(), %start, %end, error = %err, "load_data failed");
    }
    result
}

fn fetch_and_clean(
    provider: &dyn DataProvider,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<CanonicalSeries, Error> {
    if start >= end {
        return Err(Error::EmptyResult {
            ticker: ticker.to_string(),
            stage: EmptyStage::Fetch,
        });
    }

    let raw = provider
        .fetch(ticker, start, end)
        .map_err(|e| Error::DataLoad {
            ticker: ticker.to_string(),
            message: e.to_string(),
        })?;

    if raw.is_empty() {
        return Err(Error::EmptyResult {
            ticker: ticker.to_string(),
            stage: EmptyStage::Fetch,
        });
    }

    debug!(
        ticker,
        rows = raw.height(),
        shape = ?raw.shape(),
        "fetched raw series"
    );

    Canonicalizer::clean(ticker, raw).map_err(|e| match e {
        CleanError::NoValidRows => Error::EmptyResult {
            ticker: ticker.to_string(),
            stage: EmptyStage::Cleaning,
        },
        other => Error::DataLoad {
            ticker: ticker.to_string(),
            message: other.to_string(),
        },
    })
}
