//! Export: CSV, JSON and Markdown artifacts for a forecast.
//!
//! - **CSV**: forecast table and the cleaned history for external tools
//! - **JSON**: the report summary
//! - **Markdown**: a human-readable single-forecast report

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stockcast_core::{CanonicalSeries, ForecastTable};

use crate::session::{ForecastReport, ReportSummary};

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns written by [`forecast_csv`].
pub const FORECAST_CSV_COLUMNS: [&str; 7] = [
    "ds",
    "yhat",
    "yhat_lower",
    "yhat_upper",
    "trend",
    "weekly",
    "yearly",
];

/// Export a forecast table as CSV, one row per date.
pub fn forecast_csv(table: &ForecastTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(FORECAST_CSV_COLUMNS)?;

    for p in table.rows() {
        wtr.write_record([
            &p.ds.to_string(),
            &format!("{:.4}", p.yhat),
            &format!("{:.4}", p.yhat_lower),
            &format!("{:.4}", p.yhat_upper),
            &format!("{:.4}", p.trend),
            &format!("{:.4}", p.weekly),
            &format!("{:.4}", p.yearly),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a cleaned series as `Date,Open,Close`. Missing opens are empty cells.
pub fn series_csv(series: &CanonicalSeries) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["Date", "Open", "Close"])?;

    let dates = series.optional_dates();
    let opens = series.opens();
    let closes = series.optional_closes();
    for ((date, open), close) in dates.iter().zip(&opens).zip(&closes) {
        wtr.write_record([
            date.map(|d| d.to_string()).unwrap_or_default(),
            open.map(|v| format!("{v:.4}")).unwrap_or_default(),
            close.map(|v| format!("{v:.4}")).unwrap_or_default(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn write_forecast_csv(path: &Path, table: &ForecastTable) -> Result<()> {
    let csv = forecast_csv(table)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_series_csv(path: &Path, series: &CanonicalSeries) -> Result<()> {
    let csv = series_csv(series)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn summary_json(summary: &ReportSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize report summary to JSON")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one forecast.
///
/// Creates `{ticker}_{years}y/` under `output_dir` containing:
/// - `forecast.csv`
/// - `history.csv`
/// - `summary.json`
/// - `report.md`
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &ForecastReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!("{}_{}y", report.ticker, report.years));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write_forecast_csv(&run_dir.join("forecast.csv"), &report.table)?;
    write_series_csv(&run_dir.join("history.csv"), &report.series)?;

    let json = summary_json(&report.summary())?;
    std::fs::write(run_dir.join("summary.json"), json)?;
    std::fs::write(run_dir.join("report.md"), generate_report(report))?;

    Ok(run_dir)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report: metadata, the forecast tail and the active components.
pub fn generate_report(report: &ForecastReport) -> String {
    let summary = report.summary();
    let mut md = String::with_capacity(2048);

    md.push_str(&format!("# Forecast Report: {}\n\n", report.ticker));

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Ticker | {} |\n", summary.ticker));
    if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
        md.push_str(&format!("| History | {first} to {last} |\n"));
    }
    md.push_str(&format!("| Trading Days | {} |\n", summary.history_rows));
    md.push_str(&format!(
        "| Horizon | {} years ({} days) |\n",
        summary.years, summary.horizon_days
    ));
    md.push_str(&format!(
        "| Components | {} |\n",
        report.components.names().join(", ")
    ));
    md.push('\n');

    md.push_str("## Forecast Tail\n\n");
    md.push_str("| Date | yhat | Lower | Upper |\n");
    md.push_str("| --- | ---: | ---: | ---: |\n");
    for p in report.table.tail(5) {
        md.push_str(&format!(
            "| {} | {:.2} | {:.2} | {:.2} |\n",
            p.ds, p.yhat, p.yhat_lower, p.yhat_upper
        ));
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use stockcast_core::forecast::ForecastPoint;

    fn sample_table(n: usize) -> ForecastTable {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let rows = (0..n)
            .map(|i| {
                let y = 100.0 + i as f64;
                ForecastPoint {
                    ds: start + Days::new(i as u64),
                    trend: y,
                    yhat_lower: y - 2.0,
                    yhat_upper: y + 2.0,
                    trend_lower: y - 1.0,
                    trend_upper: y + 1.0,
                    additive_terms: 0.0,
                    weekly: 0.0,
                    yearly: 0.0,
                    yhat: y,
                }
            })
            .collect();
        ForecastTable::new(rows)
    }

    #[test]
    fn forecast_csv_header_and_rows() {
        let csv = forecast_csv(&sample_table(3)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4); // header + 3 rows
        assert_eq!(lines[0], FORECAST_CSV_COLUMNS.join(","));
        assert!(lines[1].starts_with("2024-03-01,100.0000,98.0000,102.0000"));
        assert!(lines[3].starts_with("2024-03-03,102.0000"));
    }

    #[test]
    fn forecast_csv_empty_table() {
        let csv = forecast_csv(&ForecastTable::default()).unwrap();
        assert_eq!(csv.lines().count(), 1); // header only
    }

    #[test]
    fn write_forecast_csv_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.csv");
        write_forecast_csv(&path, &sample_table(10)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 11);
    }

    #[test]
    fn write_into_missing_dir_fails_with_path() {
        let err = write_forecast_csv(Path::new("/nonexistent/dir/f.csv"), &sample_table(1))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dir/f.csv"));
    }
}
