//! Cross-asset analytics over aligned returns.

pub mod correlation;
pub mod matrix;

pub use correlation::{pairwise_correlate, pearson, CorrelationMatrix, OverlapMatrix};
pub use matrix::SymbolMatrix;
