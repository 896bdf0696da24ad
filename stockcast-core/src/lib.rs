//! Stockcast Core: price loading, cleaning, and forecasting.
//!
//! This crate contains the pipeline:
//! - Providers returning raw, possibly grouped-header tables
//! - Cleaning into a canonical `Date`/`Open`/`Close` series (`load_data`)
//! - The `(ds, y)` training adapter and the forecasting engine boundary
//! - An additive trend + seasonality model with simulated intervals
//! - One error taxonomy for every stage

pub mod data;
pub mod error;
pub mod forecast;
pub mod rng;

pub use data::{load_data, CanonicalSeries, DataProvider, RawSeries};
pub use error::{EmptyStage, Error};
pub use forecast::{make_forecast, train_model, ForecastTable, TrainingFrame};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline types can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<CanonicalSeries>();
        require_sync::<CanonicalSeries>();
        require_send::<RawSeries>();
        require_sync::<RawSeries>();
        require_send::<ForecastTable>();
        require_sync::<ForecastTable>();
        require_send::<forecast::AdditiveModel>();
        require_sync::<forecast::AdditiveModel>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<Error>();
        require_sync::<Error>();
    }

    /// Providers are usable as trait objects.
    #[test]
    fn provider_trait_is_object_safe() {
        fn _takes(provider: &dyn DataProvider) -> &str {
            provider.name()
        }
        let csv = data::CsvProvider::new(".");
        assert_eq!(_takes(&csv), "csv_export");
    }
}
