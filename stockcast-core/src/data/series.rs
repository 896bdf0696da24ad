//! The canonical price series: the contract boundary between data loading and
//! everything downstream.

use super::canonicalize::date_from_epoch_days;
use super::schema::{CanonicalSchema, SchemaError, CLOSE, DATE, OPEN};
use chrono::NaiveDate;
use polars::prelude::*;

/// Cleaned daily price table for one ticker.
///
/// Columns `Date` (Date), `Open` (Float64), `Close` (Float64) come first in
/// that order of importance; any other provider fields follow. Every row has
/// a valid `Date` and a finite `Close`, and the table is never empty.
#[derive(Debug, Clone)]
pub struct CanonicalSeries {
    ticker: String,
    frame: DataFrame,
}

impl CanonicalSeries {
    /// Wrap a cleaned frame after validating it against `CanonicalSchema`.
    pub fn from_frame(ticker: impl Into<String>, frame: DataFrame) -> Result<Self, SchemaError> {
        CanonicalSchema::validate(&frame)?;
        Ok(Self {
            ticker: ticker.into(),
            frame,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    /// Always false for a validated series; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect()
    }

    /// Trading dates in row order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.optional_dates().into_iter().flatten().collect()
    }

    /// Dates with nulls preserved (used by adapters that must drop rows pairwise).
    pub fn optional_dates(&self) -> Vec<Option<NaiveDate>> {
        match self.frame.column(DATE).and_then(|c| c.date().cloned()) {
            Ok(ca) => (0..ca.len())
                .map(|i| ca.get(i).and_then(date_from_epoch_days))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Close prices in row order.
    pub fn closes(&self) -> Vec<f64> {
        self.optional_closes().into_iter().flatten().collect()
    }

    pub fn optional_closes(&self) -> Vec<Option<f64>> {
        self.float_column(CLOSE)
    }

    /// Open prices in row order; `None` where the provider had no usable value.
    pub fn opens(&self) -> Vec<Option<f64>> {
        self.float_column(OPEN)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates().first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates().last().copied()
    }

    /// Last `n` rows as a frame, for previews.
    pub fn tail(&self, n: usize) -> DataFrame {
        self.frame.tail(Some(n))
    }

    /// BLAKE3 fingerprint over column names, dtypes and every cell.
    ///
    /// Two series are bit-identical exactly when their fingerprints match.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.ticker.as_bytes());
        for column in self.frame.get_columns() {
            hasher.update(column.name().as_bytes());
            hasher.update(format!("{:?}", column.dtype()).as_bytes());
            let series = column.as_materialized_series();
            match series.f64() {
                Ok(ca) => {
                    for v in ca.iter() {
                        match v {
                            Some(x) => hasher.update(&x.to_bits().to_le_bytes()),
                            None => hasher.update(&[0xff]),
                        };
                    }
                }
                Err(_) => {
                    for i in 0..series.len() {
                        let cell = series.get(i).map(|v| v.to_string()).unwrap_or_default();
                        hasher.update(cell.as_bytes());
                        hasher.update(&[0x1f]);
                    }
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    fn float_column(&self, name: &str) -> Vec<Option<f64>> {
        match self.frame.column(name).and_then(|c| c.f64().cloned()) {
            Ok(ca) => ca.iter().collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::canonicalize::date_column;

    fn sample() -> CanonicalSeries {
        let dates: Vec<Option<NaiveDate>> = (2..=4)
            .map(|d| NaiveDate::from_ymd_opt(2024, 1, d))
            .collect();
        let df = DataFrame::new(vec![
            date_column(DATE, &dates).unwrap(),
            Column::new(OPEN.into(), &[Some(100.0), None, Some(102.0)]),
            Column::new(CLOSE.into(), &[101.0, 102.0, 103.0]),
        ])
        .unwrap();
        CanonicalSeries::from_frame("SPY", df).unwrap()
    }

    #[test]
    fn accessors_follow_row_order() {
        let s = sample();
        assert_eq!(s.len(), 3);
        assert_eq!(s.ticker(), "SPY");
        assert_eq!(s.closes(), vec![101.0, 102.0, 103.0]);
        assert_eq!(s.opens(), vec![Some(100.0), None, Some(102.0)]);
        assert_eq!(s.first_date(), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(s.last_date(), NaiveDate::from_ymd_opt(2024, 1, 4));
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let a = sample();
        let b = sample();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let df = a
            .frame()
            .clone()
            .lazy()
            .with_column(col(CLOSE) * lit(2.0))
            .collect()
            .unwrap();
        let c = CanonicalSeries::from_frame("SPY", df).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn tail_returns_last_rows() {
        let s = sample();
        assert_eq!(s.tail(2).height(), 2);
        assert_eq!(s.tail(10).height(), 3);
    }

    #[test]
    fn empty_frame_is_rejected() {
        let df = DataFrame::new(vec![
            date_column(DATE, &[]).unwrap(),
            Column::new(OPEN.into(), Vec::<f64>::new()),
            Column::new(CLOSE.into(), Vec::<f64>::new()),
        ])
        .unwrap();
        assert!(matches!(
            CanonicalSeries::from_frame("SPY", df),
            Err(SchemaError::Empty)
        ));
    }
}
