use polars::prelude::*;

/// Column names of the canonical price table.
pub const DATE: &str = "Date";
pub const OPEN: &str = "Open";
pub const CLOSE: &str = "Close";

/// Required columns of a canonical price series
pub struct CanonicalSchema;

impl CanonicalSchema {
    /// The required part of the canonical schema. Extra provider columns are allowed.
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new(DATE.into(), DataType::Date),
            Field::new(OPEN.into(), DataType::Float64),
            Field::new(CLOSE.into(), DataType::Float64),
        ])
    }

    /// Validate a cleaned DataFrame against the schema and the row invariants:
    /// non-empty, no nulls in `Date` or `Close`, every `Close` finite.
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let expected = Self::schema();
        let actual = df.schema();

        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        if df.height() == 0 {
            return Err(SchemaError::Empty);
        }

        for name in [DATE, CLOSE] {
            let nulls = df
                .column(name)
                .map_err(|_| SchemaError::MissingColumn(name.to_string()))?
                .null_count();
            if nulls > 0 {
                return Err(SchemaError::NullValues {
                    column: name.to_string(),
                    count: nulls,
                });
            }
        }

        let non_finite = df
            .column(CLOSE)
            .and_then(|c| c.f64().map(|ca| ca.iter().flatten().filter(|v| !v.is_finite()).count()))
            .map_err(|_| SchemaError::MissingColumn(CLOSE.to_string()))?;
        if non_finite > 0 {
            return Err(SchemaError::NonFinite {
                column: CLOSE.to_string(),
                count: non_finite,
            });
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("Column {column} has {count} null value(s)")]
    NullValues { column: String, count: usize },

    #[error("Column {column} has {count} non-finite value(s)")]
    NonFinite { column: String, count: usize },

    #[error("Series has no rows")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date_column(days: &[i32]) -> Column {
        Column::new(DATE.into(), days.to_vec())
            .cast(&DataType::Date)
            .unwrap()
    }

    #[test]
    fn test_schema_has_all_required_columns() {
        let schema = CanonicalSchema::schema();
        assert!(schema.contains(DATE));
        assert!(schema.contains(OPEN));
        assert!(schema.contains(CLOSE));
    }

    #[test]
    fn test_validate_accepts_valid_dataframe() {
        let df = DataFrame::new(vec![
            date_column(&[19724, 19725]),
            Column::new(OPEN.into(), &[400.0, 401.0]),
            Column::new(CLOSE.into(), &[403.0, 404.0]),
            Column::new("Volume".into(), &[1_000_000.0, 900_000.0]),
        ])
        .unwrap();

        let result = CanonicalSchema::validate(&df);
        if let Err(ref e) = result {
            eprintln!("Validation error: {:?}", e);
        }
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_column() {
        let df = DataFrame::new(vec![
            date_column(&[19724]),
            Column::new(OPEN.into(), &[400.0]),
        ])
        .unwrap();

        let result = CanonicalSchema::validate(&df);
        assert!(matches!(result.unwrap_err(), SchemaError::MissingColumn(c) if c == CLOSE));
    }

    #[test]
    fn test_validate_rejects_wrong_type() {
        let df = DataFrame::new(vec![
            date_column(&[19724]),
            Column::new(OPEN.into(), &[400.0]),
            Column::new(CLOSE.into(), &["not_a_number"]),
        ])
        .unwrap();

        let result = CanonicalSchema::validate(&df);
        assert!(matches!(result.unwrap_err(), SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_validate_rejects_null_close() {
        let df = DataFrame::new(vec![
            date_column(&[19724, 19725]),
            Column::new(OPEN.into(), &[400.0, 401.0]),
            Column::new(CLOSE.into(), &[Some(403.0), None]),
        ])
        .unwrap();

        let result = CanonicalSchema::validate(&df);
        assert!(matches!(
            result.unwrap_err(),
            SchemaError::NullValues { count: 1, .. }
        ));
    }

    #[test]
    fn test_validate_rejects_nan_close() {
        let df = DataFrame::new(vec![
            date_column(&[19724]),
            Column::new(OPEN.into(), &[400.0]),
            Column::new(CLOSE.into(), &[f64::NAN]),
        ])
        .unwrap();

        let result = CanonicalSchema::validate(&df);
        assert!(matches!(result.unwrap_err(), SchemaError::NonFinite { .. }));
    }
}
