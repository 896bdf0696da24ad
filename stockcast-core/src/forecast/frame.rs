//! Training frame: the exact two-column shape the engine consumes.

use crate::data::canonicalize::date_column;
use crate::data::CanonicalSeries;
use chrono::NaiveDate;
use polars::prelude::*;

pub const DS: &str = "ds";
pub const Y: &str = "y";

/// `(ds, y)` pairs sorted ascending by `ds`, with no missing values.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingFrame {
    ds: Vec<NaiveDate>,
    y: Vec<f64>,
}

impl TrainingFrame {
    /// Build from pairs. Pairs with a missing side are dropped; the rest are
    /// sorted by date (stable, so same-day rows keep their order).
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Option<NaiveDate>, Option<f64>)>,
    {
        let mut rows: Vec<(NaiveDate, f64)> = pairs
            .into_iter()
            .filter_map(|(d, y)| Some((d?, y?)))
            .collect();
        rows.sort_by_key(|(d, _)| *d);
        let (ds, y) = rows.into_iter().unzip();
        Self { ds, y }
    }

    /// Project a canonical series: `Date` becomes `ds`, `Close` becomes `y`.
    pub fn from_series(series: &CanonicalSeries) -> Self {
        Self::from_pairs(
            series
                .optional_dates()
                .into_iter()
                .zip(series.optional_closes()),
        )
    }

    pub fn ds(&self) -> &[NaiveDate] {
        &self.ds
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.ds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ds.is_empty()
    }

    /// Distinct dates in ascending order.
    pub fn unique_dates(&self) -> Vec<NaiveDate> {
        let mut dates = self.ds.clone();
        dates.dedup();
        dates
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let ds: Vec<Option<NaiveDate>> = self.ds.iter().copied().map(Some).collect();
        DataFrame::new(vec![
            date_column(DS, &ds)?,
            Column::new(Y.into(), self.y.clone()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn drops_incomplete_pairs_and_sorts() {
        let frame = TrainingFrame::from_pairs(vec![
            (Some(d(3)), Some(3.0)),
            (None, Some(9.0)),
            (Some(d(1)), Some(1.0)),
            (Some(d(2)), None),
        ]);
        assert_eq!(frame.ds(), &[d(1), d(3)]);
        assert_eq!(frame.y(), &[1.0, 3.0]);
    }

    #[test]
    fn unique_dates_collapse_duplicates() {
        let frame = TrainingFrame::from_pairs(vec![
            (Some(d(2)), Some(1.0)),
            (Some(d(1)), Some(1.0)),
            (Some(d(2)), Some(2.0)),
        ]);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.unique_dates(), vec![d(1), d(2)]);
    }

    #[test]
    fn frame_has_exactly_ds_and_y() {
        let frame = TrainingFrame::from_pairs(vec![(Some(d(1)), Some(1.0))]);
        let df = frame.to_frame().unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec![DS, Y]);
        assert_eq!(df.column(DS).unwrap().dtype(), &DataType::Date);
    }
}
