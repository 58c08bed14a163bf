//! Report export: JSON for the whole report, CSV for the aligned prices.
//!
//! Every JSON export carries `schema_version`. Missing or undefined values
//! (NaN prices, undefined correlations) are written as `null`.

use std::path::Path;

use anyhow::{Context, Result};
use cryptoa_core::data::AlignedPriceTable;

use crate::runner::AnalysisReport;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize an `AnalysisReport` to pretty JSON.
pub fn export_json(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize AnalysisReport to JSON")
}

/// Write the report as pretty JSON to `path`.
pub fn write_json(report: &AnalysisReport, path: &Path) -> Result<()> {
    let json = export_json(report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Aligned price table as CSV.
///
/// Columns: date, then one column per symbol in table order.
pub fn prices_csv(table: &AlignedPriceTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date".to_string()];
    header.extend(table.symbols().map(str::to_string));
    wtr.write_record(&header).context("failed to write CSV header")?;

    for (row, date) in table.dates().iter().enumerate() {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(table.columns().iter().map(|c| format_price(c.prices[row])));
        wtr.write_record(&record)
            .with_context(|| format!("failed to write CSV row for {date}"))?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Write the aligned price table as CSV to `path`.
pub fn write_prices_csv(table: &AlignedPriceTable, path: &Path) -> Result<()> {
    let csv = prices_csv(table)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

fn format_price(price: f64) -> String {
    if price.is_finite() {
        price.to_string()
    } else {
        String::new()
    }
}
