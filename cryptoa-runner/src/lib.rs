//! CryptoA Runner: analysis orchestration on top of `cryptoa-core`.
//!
//! This crate provides:
//! - Serializable configuration with TOML loading and validation
//! - Per-symbol source chains built from one provider registry
//! - Sequential or pooled per-symbol fetching with progress callbacks
//! - The analysis report (prices, returns, correlation, overlap)
//! - Diagnostics and JSON/CSV export

pub mod config;
pub mod data_loader;
pub mod diagnostics;
pub mod export;
pub mod runner;
pub mod sources;

pub use config::{AnalysisConfig, ConfigError, FallbackRoute, Lookback, DEFAULT_UNIVERSE};
pub use data_loader::{fetch_all, fetch_symbol, FetchProgress, LogProgress, SilentProgress};
pub use diagnostics::{diagnose, Diagnostic, Severity};
pub use export::{export_json, prices_csv, write_json, write_prices_csv};
pub use runner::{build_report, run_analysis, AnalysisReport, LoadedSource, RunError, SCHEMA_VERSION};
pub use sources::SourceRegistry;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_is_send_sync() {
        assert_send::<AnalysisReport>();
        assert_sync::<AnalysisReport>();
        assert_send::<Diagnostic>();
        assert_sync::<Diagnostic>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<AnalysisConfig>();
        assert_sync::<AnalysisConfig>();
        assert_send::<SourceRegistry>();
        assert_sync::<SourceRegistry>();
    }

    #[test]
    fn run_error_is_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
