//! CryptoA Core: price series model, source clients, and the reconciliation engine.
//!
//! This crate contains everything below the orchestration layer:
//! - Price series, source identities and the fetch error taxonomy
//! - Source clients for Yahoo Finance, Alpha Vantage and CoinGecko
//! - Bounded retry and the per-symbol source fallback chain
//! - Multi-symbol date alignment with forward/backward fill
//! - Return computation and overlap-aware pairwise correlation

pub mod analytics;
pub mod data;
