//! Raw provider tables, before any cleaning.
//!
//! A `RawSeries` is a date index plus a list of columns. Each column carries a
//! header key with one or more levels: `["Close"]` for a flat header, or
//! `["Close", "AAPL"]` when the provider nests the ticker under the field
//! name. Index and cells are kept in whatever type the provider produced
//! (typed dates and floats from JSON APIs, strings from CSV exports).

use super::provider::ProviderError;
use polars::prelude::*;

/// Name of the index column in every raw series.
pub const INDEX_NAME: &str = "Date";

/// Multi-level column header key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    levels: Vec<String>,
}

impl ColumnKey {
    /// Single-level key, e.g. `Close`.
    pub fn flat(field: impl Into<String>) -> Self {
        Self {
            levels: vec![field.into()],
        }
    }

    /// Two-level key with the ticker nested under the field, e.g. `(Close, AAPL)`.
    pub fn grouped(field: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            levels: vec![field.into(), ticker.into()],
        }
    }

    /// Build a key from arbitrary levels. Empty input yields an empty field name.
    pub fn from_levels<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            levels: levels.into_iter().map(Into::into).collect(),
        }
    }

    /// Top-level field name.
    pub fn field(&self) -> &str {
        self.levels.first().map(String::as_str).unwrap_or("")
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }
}

/// Shape of a raw column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderShape {
    /// One level per column: `Open`, `Close`, ...
    Flat,
    /// Field names with the ticker nested below: `(Open, AAPL)`, ...
    GroupedByTicker,
}

/// One raw column: header key and values.
#[derive(Debug, Clone)]
pub struct RawColumn {
    pub key: ColumnKey,
    pub values: Column,
}

impl RawColumn {
    pub fn new(key: ColumnKey, values: Column) -> Self {
        Self { key, values }
    }
}

/// A provider table keyed by trading date.
#[derive(Debug, Clone)]
pub struct RawSeries {
    index: Column,
    columns: Vec<RawColumn>,
}

impl RawSeries {
    /// Build a raw series; every column must have as many rows as the index.
    pub fn new(index: Column, columns: Vec<RawColumn>) -> Result<Self, ProviderError> {
        let height = index.len();
        if let Some(bad) = columns.iter().find(|c| c.values.len() != height) {
            return Err(ProviderError::ResponseFormatChanged(format!(
                "column {:?} has {} rows, index has {height}",
                bad.key.levels(),
                bad.values.len()
            )));
        }
        Ok(Self { index, columns })
    }

    /// A table with no rows and no columns (what providers return for unknown tickers).
    pub fn empty() -> Self {
        Self {
            index: Column::new(INDEX_NAME.into(), Vec::<String>::new()),
            columns: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn index(&self) -> &Column {
        &self.index
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    /// Detect whether the header is flat or grouped by ticker.
    pub fn shape(&self) -> HeaderShape {
        if self.columns.iter().any(|c| c.key.depth() > 1) {
            HeaderShape::GroupedByTicker
        } else {
            HeaderShape::Flat
        }
    }

    /// First column whose top-level field matches `field`.
    pub fn column(&self, field: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.key.field() == field)
    }

    pub fn into_parts(self) -> (Column, Vec<RawColumn>) {
        (self.index, self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(n: usize) -> Column {
        let dates: Vec<String> = (1..=n).map(|d| format!("2024-01-{d:02}")).collect();
        Column::new(INDEX_NAME.into(), dates)
    }

    #[test]
    fn flat_header_detected() {
        let raw = RawSeries::new(
            index(2),
            vec![
                RawColumn::new(ColumnKey::flat("Open"), Column::new("Open".into(), &[1.0, 2.0])),
                RawColumn::new(ColumnKey::flat("Close"), Column::new("Close".into(), &[1.5, 2.5])),
            ],
        )
        .unwrap();

        assert_eq!(raw.shape(), HeaderShape::Flat);
        assert_eq!(raw.height(), 2);
        assert!(raw.column("Close").is_some());
    }

    #[test]
    fn grouped_header_detected() {
        let raw = RawSeries::new(
            index(1),
            vec![RawColumn::new(
                ColumnKey::grouped("Close", "AAPL"),
                Column::new("Close".into(), &[1.0]),
            )],
        )
        .unwrap();

        assert_eq!(raw.shape(), HeaderShape::GroupedByTicker);
        assert_eq!(raw.columns()[0].key.field(), "Close");
    }

    #[test]
    fn mismatched_column_length_rejected() {
        let result = RawSeries::new(
            index(3),
            vec![RawColumn::new(ColumnKey::flat("Close"), Column::new("Close".into(), &[1.0]))],
        );
        assert!(matches!(result, Err(ProviderError::ResponseFormatChanged(_))));
    }

    #[test]
    fn empty_series_has_no_rows() {
        let raw = RawSeries::empty();
        assert!(raw.is_empty());
        assert_eq!(raw.shape(), HeaderShape::Flat);
    }
}
