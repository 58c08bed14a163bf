//! Multi-symbol time alignment.
//!
//! Given one series per symbol, align them to the union of their dates.
//! Gaps are forward-filled, then any leading gap is backward-filled, so a
//! column is dense as soon as its series has a single observation. Every
//! cell remembers whether it was observed or carried.

use super::provider::PriceSeries;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// How a cell of the aligned table got its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellOrigin {
    Observed,
    /// Carried forward from the nearest earlier observation.
    ForwardFilled,
    /// Carried backward from the first observation (leading gap).
    BackFilled,
}

/// One symbol's column on the common timeline.
#[derive(Debug, Clone, Serialize)]
pub struct AlignedColumn {
    pub symbol: String,
    /// Same length as the table's dates.
    pub prices: Vec<f64>,
    pub origins: Vec<CellOrigin>,
}

impl AlignedColumn {
    pub fn observed_count(&self) -> usize {
        self.origins
            .iter()
            .filter(|o| **o == CellOrigin::Observed)
            .count()
    }

    pub fn filled_count(&self) -> usize {
        self.origins.len() - self.observed_count()
    }

    /// Prices rebased to 100 at the first observed price.
    pub fn rebased(&self) -> Vec<f64> {
        let base = self
            .origins
            .iter()
            .position(|o| *o == CellOrigin::Observed)
            .map(|i| self.prices[i]);
        match base {
            Some(b) if b != 0.0 && b.is_finite() => {
                self.prices.iter().map(|p| p / b * 100.0).collect()
            }
            _ => vec![f64::NAN; self.prices.len()],
        }
    }
}

/// Dense date × symbol price matrix.
#[derive(Debug, Clone, Serialize)]
pub struct AlignedPriceTable {
    /// The common date axis (sorted ascending, unique).
    dates: Vec<NaiveDate>,
    /// Columns in input order.
    columns: Vec<AlignedColumn>,
}

impl AlignedPriceTable {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[AlignedColumn] {
        &self.columns
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.symbol.as_str())
    }

    pub fn column(&self, symbol: &str) -> Option<&AlignedColumn> {
        self.columns.iter().find(|c| c.symbol == symbol)
    }

    /// Price of `symbol` on `date`, if both are in the table.
    pub fn price(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        let row = self.dates.binary_search(&date).ok()?;
        self.column(symbol).map(|c| c.prices[row])
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Normalized price trend: every column rebased to 100.
    pub fn normalized(&self) -> Vec<(String, Vec<f64>)> {
        self.columns
            .iter()
            .map(|c| (c.symbol.clone(), c.rebased()))
            .collect()
    }
}

/// Align series to a common timeline.
///
/// Empty series are left out entirely (the caller reports them as failed);
/// a repeated symbol keeps its first series.
pub fn align_series(series: &[PriceSeries]) -> AlignedPriceTable {
    let mut seen = HashSet::new();
    let inputs: Vec<&PriceSeries> = series
        .iter()
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.symbol()))
        .collect();

    // Collect the union of all dates
    let dates: Vec<NaiveDate> = inputs
        .iter()
        .flat_map(|s| s.points().iter().map(|p| p.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let columns = inputs
        .iter()
        .map(|s| align_one(s, &dates))
        .collect::<Vec<_>>();

    debug!(
        rows = dates.len(),
        columns = columns.len(),
        "aligned price table"
    );

    AlignedPriceTable { dates, columns }
}

fn align_one(series: &PriceSeries, dates: &[NaiveDate]) -> AlignedColumn {
    let by_date: HashMap<NaiveDate, f64> =
        series.points().iter().map(|p| (p.date, p.close)).collect();

    let mut prices = Vec::with_capacity(dates.len());
    let mut origins = Vec::with_capacity(dates.len());
    let mut last = None;

    for date in dates {
        match by_date.get(date) {
            Some(&price) => {
                last = Some(price);
                prices.push(price);
                origins.push(CellOrigin::Observed);
            }
            None => match last {
                Some(price) => {
                    prices.push(price);
                    origins.push(CellOrigin::ForwardFilled);
                }
                None => {
                    prices.push(f64::NAN);
                    origins.push(CellOrigin::BackFilled);
                }
            },
        }
    }

    // Leading gap: carry the earliest observation backward
    if let Some(first) = series.points().first() {
        for price in prices.iter_mut().take_while(|p| p.is_nan()) {
            *price = first.close;
        }
    }

    AlignedColumn {
        symbol: series.symbol().to_string(),
        prices,
        origins,
    }
}
