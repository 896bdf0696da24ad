//! Error taxonomy shared by every pipeline stage.
//!
//! Fetch and clean failures are normalized to `EmptyResult` or `DataLoad`;
//! training and prediction failures are wrapped with the ticker they concern.
//! Provider and model errors only ever appear as the cause inside these.

use crate::forecast::ModelError;
use thiserror::Error;

/// Stage at which a load produced no usable rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyStage {
    /// The provider returned zero rows.
    Fetch,
    /// Rows were returned but none survived date/close validation.
    Cleaning,
}

impl EmptyStage {
    fn message(self, ticker: &str) -> String {
        match self {
            EmptyStage::Fetch => format!("No data found for ticker {ticker}."),
            EmptyStage::Cleaning => {
                format!("After cleaning, no valid data remains for ticker {ticker}.")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", .stage.message(.ticker))]
    EmptyResult { ticker: String, stage: EmptyStage },

    #[error("Failed to load data for {ticker}: {message}")]
    DataLoad { ticker: String, message: String },

    #[error("Failed to train forecasting model for {ticker}: {source}")]
    Train { ticker: String, source: ModelError },

    #[error("Failed to forecast {ticker}: {source}")]
    Forecast { ticker: String, source: ModelError },
}

impl Error {
    pub fn ticker(&self) -> &str {
        match self {
            Error::EmptyResult { ticker, .. }
            | Error::DataLoad { ticker, .. }
            | Error::Train { ticker, .. }
            | Error::Forecast { ticker, .. } => ticker,
        }
    }

    /// True for the two kinds the fetch boundary produces.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Error::EmptyResult { .. } | Error::DataLoad { .. })
    }
}
