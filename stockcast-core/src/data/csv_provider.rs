//! CSV export provider.
//!
//! Reads `{dir}/{TICKER}.csv` files as written by common download tools.
//! Two layouts are understood:
//!
//! ```text
//! Date,Open,High,Low,Close,Volume          (flat)
//!
//! Price,Close,High,Low,Open,Volume         (grouped by ticker)
//! Ticker,AAPL,AAPL,AAPL,AAPL,AAPL
//! Date,,,,,
//! ```
//!
//! Cells are handed on as text; typing them is the cleaner's job.

use super::provider::{DataProvider, ProviderError};
use super::raw::{ColumnKey, RawColumn, RawSeries, INDEX_NAME};
use super::canonicalize::parse_date;
use chrono::NaiveDate;
use csv::StringRecord;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provider backed by a directory of per-ticker CSV files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }

    /// Parse CSV text into a raw series, keeping rows dated in `[start, end)`.
    ///
    /// Rows whose date cannot be read are kept so that cleaning reports them.
    pub fn parse<R: std::io::Read>(
        reader: R,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, ProviderError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| ProviderError::ResponseFormatChanged(e.to_string()))?;
            records.push(record);
        }

        let Some(header) = records.first() else {
            return Ok(RawSeries::empty());
        };

        let grouped = records.len() >= 3
            && first_cell(&records[1]) == "Ticker"
            && first_cell(&records[2]) == INDEX_NAME;

        let width = header.len();
        let keys: Vec<ColumnKey> = (1..width)
            .map(|i| {
                let field = header.get(i).unwrap_or("").trim();
                if grouped {
                    ColumnKey::grouped(field, records[1].get(i).unwrap_or("").trim())
                } else {
                    ColumnKey::flat(field)
                }
            })
            .collect();

        let body = if grouped { &records[3..] } else { &records[1..] };

        let mut index: Vec<Option<String>> = Vec::with_capacity(body.len());
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(body.len()); keys.len()];

        for record in body {
            let date_cell = first_cell(record);
            if let Some(date) = parse_date(date_cell) {
                if date < start || date >= end {
                    continue;
                }
            }
            index.push(non_empty(date_cell));
            for (i, column) in cells.iter_mut().enumerate() {
                column.push(record.get(i + 1).and_then(non_empty));
            }
        }

        if index.is_empty() {
            return Ok(RawSeries::empty());
        }

        let columns = keys
            .into_iter()
            .zip(cells)
            .map(|(key, values)| {
                let name = key.field().to_string();
                RawColumn::new(key, Column::new(name.as_str().into(), values))
            })
            .collect();

        RawSeries::new(Column::new(INDEX_NAME.into(), index), columns)
    }
}

fn first_cell(record: &StringRecord) -> &str {
    record.get(0).map(str::trim).unwrap_or("")
}

fn non_empty(cell: &str) -> Option<String> {
    let cell = cell.trim();
    (!cell.is_empty()).then(|| cell.to_string())
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_export"
    }

    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, ProviderError> {
        let path = self.path_for(ticker);
        let file = match std::fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(ticker, path = %path.display(), "no CSV export for ticker");
                return Ok(RawSeries::empty());
            }
            Err(e) => {
                return Err(ProviderError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            }
        };
        Self::parse(std::io::BufReader::new(file), start, end)
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}
