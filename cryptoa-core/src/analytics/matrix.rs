//! Square symbol-by-symbol matrix.

use serde::Serialize;

/// Square matrix indexed by symbol, rows and columns in the same order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolMatrix<T> {
    symbols: Vec<String>,
    values: Vec<Vec<T>>,
}

impl<T: Clone> SymbolMatrix<T> {
    /// A matrix with every cell set to `fill`.
    pub fn filled(symbols: Vec<String>, fill: T) -> Self {
        let n = symbols.len();
        Self {
            symbols,
            values: vec![vec![fill; n]; n],
        }
    }
}

impl<T> SymbolMatrix<T> {
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    pub fn at(&self, row: usize, col: usize) -> &T {
        &self.values[row][col]
    }

    /// Cell for a symbol pair, `None` if either symbol is absent.
    pub fn get(&self, a: &str, b: &str) -> Option<&T> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(&self.values[i][j])
    }

    pub fn rows(&self) -> &[Vec<T>] {
        &self.values
    }

    /// Write both `(i, j)` and `(j, i)`.
    pub(crate) fn set_symmetric(&mut self, i: usize, j: usize, value: T)
    where
        T: Clone,
    {
        self.values[j][i] = value.clone();
        self.values[i][j] = value;
    }

    /// Off-diagonal pairs `(i, j)` with `i < j`.
    pub fn upper_pairs(&self) -> impl Iterator<Item = (usize, usize)> {
        let n = self.len();
        (0..n).flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_set_and_lookup() {
        let mut m = SymbolMatrix::filled(vec!["A".into(), "B".into()], 0usize);
        m.set_symmetric(0, 1, 7);
        assert_eq!(m.get("A", "B"), Some(&7));
        assert_eq!(m.get("B", "A"), Some(&7));
        assert_eq!(m.get("A", "Z"), None);
    }

    #[test]
    fn upper_pairs_skip_diagonal() {
        let m = SymbolMatrix::filled(vec!["A".into(), "B".into(), "C".into()], ());
        let pairs: Vec<_> = m.upper_pairs().collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
    }
}
