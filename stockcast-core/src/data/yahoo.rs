//! Yahoo Finance data provider.
//!
//! Fetches daily rows from Yahoo's v8 chart API. Handles rate limiting,
//! retries with exponential backoff, response parsing, and the circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! The CSV provider is the fallback when Yahoo is unavailable.

use super::canonicalize::date_column;
use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataProvider, ProviderError};
use super::raw::{ColumnKey, RawColumn, RawSeries, INDEX_NAME};
use chrono::{NaiveDate, NaiveTime};
use polars::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Tunables for the Yahoo provider.
#[derive(Debug, Clone)]
pub struct YahooSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Emit `(field, ticker)` column keys, as Yahoo-backed download tools do by default.
    pub grouped_header: bool,
}

impl Default for YahooSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            grouped_header: true,
        }
    }
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    settings: YahooSettings,
}

impl YahooProvider {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        settings: YahooSettings,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self {
            client,
            circuit_breaker,
            settings,
        })
    }

    /// Build the chart API URL for `[start, end)`.
    pub fn chart_url(ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{ticker}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    /// Turn a chart response into a raw series, keeping only rows dated in `[start, end)`.
    ///
    /// Missing cells stay null; deciding which rows are usable is the cleaner's job.
    /// An unknown ticker yields an empty series rather than an error.
    pub fn parse_response(
        ticker: &str,
        resp: ChartResponse,
        start: NaiveDate,
        end: NaiveDate,
        grouped_header: bool,
    ) -> Result<RawSeries, ProviderError> {
        let result = match resp.chart.result {
            Some(result) => result,
            None => {
                return match resp.chart.error {
                    Some(err) if err.code == "Not Found" => Ok(RawSeries::empty()),
                    Some(err) => Err(ProviderError::ResponseFormatChanged(format!(
                        "{}: {}",
                        err.code, err.description
                    ))),
                    None => Err(ProviderError::ResponseFormatChanged(
                        "empty result with no error".into(),
                    )),
                };
            }
        };

        let Some(data) = result.into_iter().next() else {
            return Ok(RawSeries::empty());
        };

        // No trading days in range: Yahoo omits the timestamp array entirely.
        let Some(timestamps) = data.timestamp else {
            return Ok(RawSeries::empty());
        };

        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose)
            .unwrap_or_default();

        let mut dates = Vec::with_capacity(timestamps.len());
        let mut open = Vec::with_capacity(timestamps.len());
        let mut high = Vec::with_capacity(timestamps.len());
        let mut low = Vec::with_capacity(timestamps.len());
        let mut close = Vec::with_capacity(timestamps.len());
        let mut adj_close = Vec::with_capacity(timestamps.len());
        let mut volume = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    ProviderError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;
            if date < start || date >= end {
                continue;
            }

            dates.push(Some(date));
            open.push(quote.open.get(i).copied().flatten());
            high.push(quote.high.get(i).copied().flatten());
            low.push(quote.low.get(i).copied().flatten());
            close.push(quote.close.get(i).copied().flatten());
            adj_close.push(adj_closes.get(i).copied().flatten());
            volume.push(quote.volume.get(i).copied().flatten());
        }

        let key = |field: &str| {
            if grouped_header {
                ColumnKey::grouped(field, ticker)
            } else {
                ColumnKey::flat(field)
            }
        };
        let frame_err = |e: PolarsError| ProviderError::ResponseFormatChanged(e.to_string());

        let index = date_column(INDEX_NAME, &dates).map_err(frame_err)?;
        RawSeries::new(
            index,
            vec![
                RawColumn::new(key("Adj Close"), Column::new("Adj Close".into(), adj_close)),
                RawColumn::new(key("Close"), Column::new("Close".into(), close)),
                RawColumn::new(key("High"), Column::new("High".into(), high)),
                RawColumn::new(key("Low"), Column::new("Low".into(), low)),
                RawColumn::new(key("Open"), Column::new("Open".into(), open)),
                RawColumn::new(key("Volume"), Column::new("Volume".into(), volume)),
            ],
        )
    }

    /// Execute the chart request with retry and circuit breaker logic.
    fn fetch_with_retry(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, ProviderError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(ProviderError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(ticker, start, end);
        let mut last_error = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let delay = self.settings.base_delay * 2u32.pow(attempt - 1);
                warn!(ticker, attempt, delay_ms = delay.as_millis() as u64, "retrying Yahoo request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(ProviderError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(ProviderError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(ProviderError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(ProviderError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                self.circuit_breaker.record_success();
                debug!(ticker, "Yahoo reports unknown ticker");
                return Ok(RawSeries::empty());
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(ProviderError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(ProviderError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ));
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(ProviderError::Other(format!("HTTP {status} for {ticker}")));
                continue;
            }

            let chart: ChartResponse = resp.json().map_err(|e| {
                ProviderError::ResponseFormatChanged(format!(
                    "failed to parse response for {ticker}: {e}"
                ))
            })?;

            let raw =
                Self::parse_response(ticker, chart, start, end, self.settings.grouped_header)?;
            self.circuit_breaker.record_success();
            return Ok(raw);
        }

        Err(last_error.unwrap_or_else(|| ProviderError::Other("max retries exceeded".into())))
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, ProviderError> {
        self.fetch_with_retry(ticker, start, end)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::raw::HeaderShape;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    // 2024-01-02, 2024-01-03, 2024-01-04 at 14:30 UTC
    const BODY: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open": [187.15, 184.22, null],
                        "high": [188.44, 185.88, 183.09],
                        "low": [183.89, 183.43, 180.88],
                        "close": [185.64, 184.25, null],
                        "volume": [82488700, 58414500, 71983600]
                    }],
                    "adjclose": [{ "adjclose": [184.73, 183.35, null] }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn chart_url_uses_half_open_range() {
        let url = YahooProvider::chart_url("AAPL", day(1), day(2));
        assert!(url.contains("/chart/AAPL?"));
        assert!(url.contains("period1=1704067200"));
        assert!(url.contains("period2=1704153600"));
    }

    #[test]
    fn parses_grouped_series_and_keeps_nulls() {
        let resp: ChartResponse = serde_json::from_str(BODY).unwrap();
        let raw = YahooProvider::parse_response("AAPL", resp, day(1), day(31), true).unwrap();

        assert_eq!(raw.height(), 3);
        assert_eq!(raw.shape(), HeaderShape::GroupedByTicker);
        let close = raw.column("Close").unwrap();
        assert_eq!(close.key.levels(), &["Close".to_string(), "AAPL".to_string()]);
        assert_eq!(close.values.null_count(), 1);
    }

    #[test]
    fn flat_header_when_not_grouped() {
        let resp: ChartResponse = serde_json::from_str(BODY).unwrap();
        let raw = YahooProvider::parse_response("AAPL", resp, day(1), day(31), false).unwrap();
        assert_eq!(raw.shape(), HeaderShape::Flat);
    }

    #[test]
    fn rows_outside_range_are_skipped() {
        let resp: ChartResponse = serde_json::from_str(BODY).unwrap();
        let raw = YahooProvider::parse_response("AAPL", resp, day(3), day(4), true).unwrap();
        assert_eq!(raw.height(), 1);
    }

    #[test]
    fn not_found_is_an_empty_series() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let raw = YahooProvider::parse_response("INVALID", resp, day(1), day(31), true).unwrap();
        assert!(raw.is_empty());
    }

    #[test]
    fn other_chart_errors_are_format_errors() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let result = YahooProvider::parse_response("AAPL", resp, day(1), day(31), true);
        assert!(matches!(result, Err(ProviderError::ResponseFormatChanged(_))));
    }

    #[test]
    fn missing_timestamps_mean_no_trading_days() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let raw = YahooProvider::parse_response("AAPL", resp, day(1), day(2), true).unwrap();
        assert!(raw.is_empty());
    }
}
