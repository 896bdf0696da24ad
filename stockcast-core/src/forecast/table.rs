//! Forecast output tables.

use crate::data::canonicalize::date_column;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Output columns, in order.
pub const FORECAST_COLUMNS: [&str; 10] = [
    "ds",
    "trend",
    "yhat_lower",
    "yhat_upper",
    "trend_lower",
    "trend_upper",
    "additive_terms",
    "weekly",
    "yearly",
    "yhat",
];

/// One forecast row. Seasonal terms are zero when the seasonality is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub ds: NaiveDate,
    pub trend: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend_lower: f64,
    pub trend_upper: f64,
    pub additive_terms: f64,
    pub weekly: f64,
    pub yearly: f64,
    pub yhat: f64,
}

/// Forecast over history plus horizon, one row per date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    rows: Vec<ForecastPoint>,
}

impl ForecastTable {
    pub fn new(rows: Vec<ForecastPoint>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ForecastPoint] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.ds).collect()
    }

    pub fn last(&self) -> Option<&ForecastPoint> {
        self.rows.last()
    }

    pub fn tail(&self, n: usize) -> &[ForecastPoint] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        FORECAST_COLUMNS.to_vec()
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let ds: Vec<Option<NaiveDate>> = self.rows.iter().map(|r| Some(r.ds)).collect();
        let pick = |f: fn(&ForecastPoint) -> f64| self.rows.iter().map(f).collect::<Vec<f64>>();

        DataFrame::new(vec![
            date_column(FORECAST_COLUMNS[0], &ds)?,
            Column::new(FORECAST_COLUMNS[1].into(), pick(|r| r.trend)),
            Column::new(FORECAST_COLUMNS[2].into(), pick(|r| r.yhat_lower)),
            Column::new(FORECAST_COLUMNS[3].into(), pick(|r| r.yhat_upper)),
            Column::new(FORECAST_COLUMNS[4].into(), pick(|r| r.trend_lower)),
            Column::new(FORECAST_COLUMNS[5].into(), pick(|r| r.trend_upper)),
            Column::new(FORECAST_COLUMNS[6].into(), pick(|r| r.additive_terms)),
            Column::new(FORECAST_COLUMNS[7].into(), pick(|r| r.weekly)),
            Column::new(FORECAST_COLUMNS[8].into(), pick(|r| r.yearly)),
            Column::new(FORECAST_COLUMNS[9].into(), pick(|r| r.yhat)),
        ])
    }
}

/// One named seasonal term of a decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalTerm {
    pub name: String,
    pub period_days: f64,
    pub values: Vec<f64>,
}

/// Trend plus each enabled seasonal term, aligned on `ds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub ds: Vec<NaiveDate>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<SeasonalTerm>,
}

impl Components {
    pub fn term(&self, name: &str) -> Option<&SeasonalTerm> {
        self.seasonal.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        std::iter::once("trend")
            .chain(self.seasonal.iter().map(|t| t.name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, yhat: f64) -> ForecastPoint {
        ForecastPoint {
            ds: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            trend: yhat,
            yhat_lower: yhat - 1.0,
            yhat_upper: yhat + 1.0,
            trend_lower: yhat,
            trend_upper: yhat,
            additive_terms: 0.0,
            weekly: 0.0,
            yearly: 0.0,
            yhat,
        }
    }

    #[test]
    fn frame_has_every_column_in_order() {
        let table = ForecastTable::new(vec![point(1, 10.0), point(2, 11.0)]);
        let df = table.to_frame().unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, FORECAST_COLUMNS.to_vec());
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn tail_is_clamped() {
        let table = ForecastTable::new(vec![point(1, 10.0), point(2, 11.0), point(3, 12.0)]);
        assert_eq!(table.tail(2).len(), 2);
        assert_eq!(table.tail(2)[0].yhat, 11.0);
        assert_eq!(table.tail(99).len(), 3);
    }
}
