//! Daily percentage returns over an aligned price table.
//!
//! A return at row `t` needs an observed price at or before `t - 1`. The
//! first row of the price table has no predecessor and is dropped; rows
//! whose predecessor was backward-filled stay in the table as invalid
//! (`None`). Forward-filled stretches produce a genuine zero return.

use super::align::{AlignedPriceTable, CellOrigin};
use chrono::NaiveDate;
use serde::Serialize;

/// Date × symbol matrix of optional returns.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnTable {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    /// `columns[i][row]`, one column per symbol.
    columns: Vec<Vec<Option<f64>>>,
}

impl ReturnTable {
    /// Build directly from columns.
    ///
    /// # Panics
    ///
    /// Panics if a column's length differs from `dates.len()` or the number
    /// of symbols and columns differ.
    pub fn new(dates: Vec<NaiveDate>, symbols: Vec<String>, columns: Vec<Vec<Option<f64>>>) -> Self {
        assert_eq!(symbols.len(), columns.len(), "one column per symbol");
        for (symbol, column) in symbols.iter().zip(&columns) {
            assert_eq!(
                column.len(),
                dates.len(),
                "return column {symbol} does not match the date axis"
            );
        }
        Self {
            dates,
            symbols,
            columns,
        }
    }

    /// First-difference percentage change of every column.
    pub fn from_prices(table: &AlignedPriceTable) -> Self {
        let dates = table.dates().iter().skip(1).copied().collect();
        let symbols = table.symbols().map(str::to_string).collect();
        let columns = table
            .columns()
            .iter()
            .map(|col| {
                (1..col.prices.len())
                    .map(|t| {
                        if col.origins[t - 1] == CellOrigin::BackFilled {
                            return None;
                        }
                        pct_change(col.prices[t - 1], col.prices[t])
                    })
                    .collect()
            })
            .collect();

        Self {
            dates,
            symbols,
            columns,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn column(&self, index: usize) -> &[Option<f64>] {
        &self.columns[index]
    }

    pub fn column_by_symbol(&self, symbol: &str) -> Option<&[Option<f64>]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Number of valid returns for the symbol at `index`.
    pub fn valid_count(&self, index: usize) -> usize {
        self.columns[index].iter().filter(|r| r.is_some()).count()
    }
}

fn pct_change(prev: f64, cur: f64) -> Option<f64> {
    if prev == 0.0 {
        return None;
    }
    let r = cur / prev - 1.0;
    r.is_finite().then_some(r)
}
