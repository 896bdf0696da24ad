//! Cleaning: raw provider table → canonical price series.
//!
//! Steps, in order:
//! 1. Detect the header shape and flatten grouped headers to field names.
//! 2. Materialize the index as an explicit `Date` column at position 0.
//! 3. Coerce `Date` to a date type (unparseable → null).
//! 4. Coerce `Close` and `Open` to Float64 (unparseable or non-finite → null).
//! 5. Drop rows with a null `Date` or `Close`.
//! 6. Sort by `Date`; when a day repeats, the last row for it wins.
//!
//! Invalid cells are never replaced by placeholders; their rows disappear.
//! `Close` is required. A missing `Open` becomes an all-null column.

use super::raw::{HeaderShape, RawSeries};
use super::schema::{SchemaError, CLOSE, DATE, OPEN};
use super::series::CanonicalSeries;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Cleaning failures. `NoValidRows` is the only one callers treat as "empty".
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("after cleaning, no valid rows remain")]
    NoValidRows,

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("duplicate column '{0}' after flattening the header")]
    DuplicateColumn(String),

    #[error("table error: {0}")]
    Frame(#[from] PolarsError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Cleaner for raw provider tables
pub struct Canonicalizer;

impl Canonicalizer {
    /// Clean a raw series into a canonical one for `ticker`.
    pub fn clean(ticker: &str, raw: RawSeries) -> Result<CanonicalSeries, CleanError> {
        let shape = raw.shape();
        if shape == HeaderShape::GroupedByTicker {
            info!(
                ticker,
                columns = raw.columns().len(),
                "grouped column header detected, flattening to field names"
            );
        }

        let (index, raw_columns) = raw.into_parts();

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(raw_columns.len() + 1);
        columns.push(date_column(DATE, &coerce_dates(&index)?)?);

        for raw_col in raw_columns {
            let name = raw_col.key.field().to_string();
            // The materialized index replaces any provider column of the same name.
            if name == DATE {
                continue;
            }
            if !seen.insert(name.clone()) {
                return Err(CleanError::DuplicateColumn(name));
            }

            let column = if name == CLOSE || name == OPEN {
                Column::new(name.as_str().into(), coerce_numeric(&raw_col.values)?)
            } else {
                coerce_opportunistic(&name, &raw_col.values)?
            };
            columns.push(column);
        }

        if !seen.contains(CLOSE) {
            return Err(CleanError::MissingColumn(CLOSE.to_string()));
        }

        let before = columns[0].len();
        if !seen.contains(OPEN) {
            debug!(ticker, "no Open column, filling with nulls");
            columns.insert(1, Column::full_null(OPEN.into(), before, &DataType::Float64));
        }

        let df = DataFrame::new(columns)?
            .lazy()
            .filter(col(DATE).is_not_null().and(col(CLOSE).is_not_null()))
            .collect()?;

        debug!(
            ticker,
            rows_in = before,
            rows_out = df.height(),
            "dropped rows with invalid Date or Close"
        );

        if df.height() == 0 {
            return Err(CleanError::NoValidRows);
        }

        let rows = chronological_rows(&read_dates(df.column(DATE)?)?);
        let duplicates = df.height() - rows.len();
        if duplicates > 0 {
            debug!(ticker, duplicates, "collapsed repeated dates, keeping the last row");
        }
        let df = df.take(&IdxCa::from_vec("rows".into(), rows))?;

        Ok(CanonicalSeries::from_frame(ticker, df)?)
    }
}

/// Row positions in ascending date order, one per distinct date.
///
/// Ties keep the row that came last in the input. Null dates are skipped.
pub fn chronological_rows(dates: &[Option<NaiveDate>]) -> Vec<IdxSize> {
    let mut order: Vec<(NaiveDate, usize)> = dates
        .iter()
        .enumerate()
        .filter_map(|(i, d)| d.map(|d| (d, i)))
        .collect();
    order.sort_unstable();

    let mut rows: Vec<IdxSize> = Vec::with_capacity(order.len());
    for (pos, &(date, i)) in order.iter().enumerate() {
        let superseded = order.get(pos + 1).is_some_and(|&(next, _)| next == date);
        if !superseded {
            rows.push(i as IdxSize);
        }
    }
    rows
}

/// Coerce an index or column to dates. Values that cannot be read become `None`.
pub fn coerce_dates(column: &Column) -> PolarsResult<Vec<Option<NaiveDate>>> {
    match column.dtype() {
        DataType::Date => read_dates(column),
        DataType::Datetime(_, _) => read_dates(&column.cast(&DataType::Date)?),
        DataType::String => {
            let ca = column.as_materialized_series().str()?;
            Ok((0..ca.len())
                .map(|i| ca.get(i).and_then(parse_date))
                .collect())
        }
        _ => Ok(vec![None; column.len()]),
    }
}

/// Coerce a column to finite Float64 values. Unparseable, NaN and infinite cells become `None`.
pub fn coerce_numeric(column: &Column) -> PolarsResult<Vec<Option<f64>>> {
    let values: Vec<Option<f64>> = match column.dtype() {
        DataType::String => {
            let ca = column.as_materialized_series().str()?;
            (0..ca.len())
                .map(|i| ca.get(i).and_then(parse_number))
                .collect()
        }
        _ => {
            let cast = column.cast(&DataType::Float64)?;
            cast.f64()?.iter().collect()
        }
    };
    Ok(values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Textual columns whose every non-empty cell is numeric become Float64; anything else is kept.
fn coerce_opportunistic(name: &str, column: &Column) -> PolarsResult<Column> {
    if column.dtype() != &DataType::String {
        return Ok(renamed(name, column));
    }

    let ca = column.as_materialized_series().str()?;
    let all_numeric = ca
        .iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .all(|s| parse_number(s).is_some());

    if all_numeric {
        Ok(Column::new(name.into(), coerce_numeric(column)?))
    } else {
        Ok(renamed(name, column))
    }
}

fn renamed(name: &str, column: &Column) -> Column {
    Column::from(column.as_materialized_series().clone().with_name(name.into()))
}

fn read_dates(column: &Column) -> PolarsResult<Vec<Option<NaiveDate>>> {
    let ca = column.date()?;
    Ok((0..ca.len())
        .map(|i| ca.get(i).and_then(date_from_epoch_days))
        .collect())
}

/// Build a Date column from optional dates.
pub fn date_column(name: &str, dates: &[Option<NaiveDate>]) -> PolarsResult<Column> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(epoch_days)).collect();
    Column::new(name.into(), days).cast(&DataType::Date)
}

pub fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_CE_DAYS
}

pub fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_CE_DAYS)?)
}

/// Parse a date cell. Accepts plain dates, naive datetimes, and RFC 3339 timestamps
/// (the date part is kept).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.date_naive());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Parse a numeric cell; non-finite values are rejected.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
