//! Data loading: providers, cleaning and the canonical series

pub mod canonicalize;
pub mod circuit_breaker;
pub mod csv_provider;
pub mod load;
pub mod provider;
pub mod raw;
pub mod schema;
pub mod series;
pub mod yahoo;

pub use canonicalize::{CleanError, Canonicalizer};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use csv_provider::CsvProvider;
pub use load::load_data;
pub use provider::{DataProvider, ProviderError};
pub use raw::{ColumnKey, HeaderShape, RawColumn, RawSeries};
pub use schema::{CanonicalSchema, SchemaError};
pub use series::CanonicalSeries;
pub use yahoo::{YahooProvider, YahooSettings};
