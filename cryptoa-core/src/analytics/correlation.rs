//! Overlap-aware pairwise Pearson correlation.
//!
//! Each pair is computed over the rows where both of its columns hold a
//! valid return, independently of every other symbol. A single global row
//! intersection would let one sparse asset shrink the sample of every
//! well-covered pair.

use crate::data::ReturnTable;
use tracing::debug;

use super::matrix::SymbolMatrix;

/// Correlation per pair; `None` when undefined (fewer than two mutually
/// valid rows, or zero variance).
pub type CorrelationMatrix = SymbolMatrix<Option<f64>>;

/// Mutually valid observation count per pair.
pub type OverlapMatrix = SymbolMatrix<usize>;

/// Pairwise correlation and overlap over a return table.
pub fn pairwise_correlate(returns: &ReturnTable) -> (CorrelationMatrix, OverlapMatrix) {
    let symbols = returns.symbols().to_vec();
    let n = symbols.len();
    let mut corr = CorrelationMatrix::filled(symbols.clone(), None);
    let mut overlap = OverlapMatrix::filled(symbols, 0);

    for i in 0..n {
        for j in i..n {
            let (xs, ys): (Vec<f64>, Vec<f64>) = returns
                .column(i)
                .iter()
                .zip(returns.column(j))
                .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                .unzip();

            let count = xs.len();
            let value = if count >= 2 {
                pearson(&xs, &ys).map(|r| if i == j { 1.0 } else { r })
            } else {
                None
            };

            overlap.set_symmetric(i, j, count);
            corr.set_symmetric(i, j, value);
        }
    }

    debug!(symbols = n, rows = returns.row_count(), "pairwise correlation");
    (corr, overlap)
}

/// Pearson correlation coefficient of two equally long samples.
///
/// Returns `None` for fewer than two points or when either sample is
/// constant.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }
    if is_constant(xs) || is_constant(ys) {
        return None;
    }

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }

    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table(columns: Vec<(&str, Vec<Option<f64>>)>) -> ReturnTable {
        let rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let dates = (0..rows)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        let (symbols, cols): (Vec<String>, Vec<_>) = columns
            .into_iter()
            .map(|(s, c)| (s.to_string(), c))
            .unzip();
        ReturnTable::new(dates, symbols, cols)
    }

    #[test]
    fn perfectly_correlated_and_anticorrelated() {
        let t = table(vec![
            ("A", vec![Some(0.01), Some(0.02), Some(-0.01), Some(0.03)]),
            ("B", vec![Some(0.02), Some(0.04), Some(-0.02), Some(0.06)]),
            ("C", vec![Some(-0.01), Some(-0.02), Some(0.01), Some(-0.03)]),
        ]);
        let (corr, overlap) = pairwise_correlate(&t);

        assert!((corr.get("A", "B").unwrap().unwrap() - 1.0).abs() < 1e-12);
        assert!((corr.get("A", "C").unwrap().unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(*overlap.get("A", "B").unwrap(), 4);
    }

    #[test]
    fn overlap_is_computed_per_pair() {
        // C is sparse; A/B must still use all four rows.
        let t = table(vec![
            ("A", vec![Some(0.01), Some(0.02), Some(-0.01), Some(0.03)]),
            ("B", vec![Some(0.01), Some(0.01), Some(-0.02), Some(0.02)]),
            ("C", vec![None, None, Some(0.05), Some(0.01)]),
        ]);
        let (corr, overlap) = pairwise_correlate(&t);

        assert_eq!(*overlap.get("A", "B").unwrap(), 4);
        assert_eq!(*overlap.get("A", "C").unwrap(), 2);
        assert_eq!(*overlap.get("C", "C").unwrap(), 2);
        assert!(corr.get("A", "B").unwrap().is_some());
    }

    #[test]
    fn fewer_than_two_rows_is_undefined() {
        let t = table(vec![
            ("A", vec![Some(0.01), None, Some(0.03)]),
            ("B", vec![None, Some(0.02), Some(0.01)]),
        ]);
        let (corr, overlap) = pairwise_correlate(&t);

        assert_eq!(*overlap.get("A", "B").unwrap(), 1);
        assert_eq!(*corr.get("A", "B").unwrap(), None);
        assert_eq!(*corr.get("B", "A").unwrap(), None);
    }

    #[test]
    fn diagonal_is_one_with_variance_and_undefined_without() {
        let t = table(vec![
            ("A", vec![Some(0.01), Some(0.02), Some(-0.01)]),
            ("FLAT", vec![Some(0.0), Some(0.0), Some(0.0)]),
        ]);
        let (corr, overlap) = pairwise_correlate(&t);

        assert_eq!(*corr.get("A", "A").unwrap(), Some(1.0));
        assert_eq!(*corr.get("FLAT", "FLAT").unwrap(), None);
        assert_eq!(*corr.get("A", "FLAT").unwrap(), None);
        assert_eq!(*overlap.get("FLAT", "FLAT").unwrap(), 3);
    }

    #[test]
    fn single_symbol_without_returns() {
        let t = table(vec![("SPY", vec![])]);
        let (corr, overlap) = pairwise_correlate(&t);
        assert_eq!(*overlap.get("SPY", "SPY").unwrap(), 0);
        assert_eq!(*corr.get("SPY", "SPY").unwrap(), None);
    }

    #[test]
    fn pearson_matches_hand_computation() {
        // x = 1..5, y = [2, 4, 5, 4, 5] → r = 0.7745966692...
        let r = pearson(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 5.0, 4.0, 5.0]).unwrap();
        assert!((r - 0.774_596_669_241_483_4).abs() < 1e-12);
    }
}
