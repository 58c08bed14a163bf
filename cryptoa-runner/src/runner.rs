//! Analysis runner: wires fetching, alignment, returns, correlation and
//! diagnostics together.
//!
//! Two entry points:
//! - `run_analysis()`: resolves the window from the wall clock, fetches every
//!   symbol through the registry, then builds the report. Used by the CLI.
//! - `build_report()`: pure, takes resolutions already fetched. Used by tests
//!   and by callers that fetch on their own schedule.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use cryptoa_core::analytics::{pairwise_correlate, CorrelationMatrix, OverlapMatrix};
use cryptoa_core::data::{align_series, AlignedPriceTable, DataSource, PriceSeries, Resolution, ReturnTable};

use crate::config::{AnalysisConfig, ConfigError};
use crate::data_loader::{fetch_all, FetchProgress};
use crate::diagnostics::{diagnose, Diagnostic};
use crate::sources::SourceRegistry;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Not a single requested symbol produced data.
    #[error("no data: none of the {} requested symbols could be loaded", requested.len())]
    NoData {
        requested: Vec<String>,
        diagnostics: Vec<Diagnostic>,
    },
}

/// Current schema version for exported reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Format of [`AnalysisReport::last_updated`].
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which provider supplied a loaded symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedSource {
    pub symbol: String,
    pub source: DataSource,
    /// Observed rows inside the window.
    pub rows: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// Aligned cells carried from a neighbouring observation.
    pub filled: usize,
}

/// Complete output of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub schema_version: u32,
    /// Requested symbols, in order.
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub prices: AlignedPriceTable,
    /// Each price column rebased to 100 at its first observation.
    pub normalized: Vec<(String, Vec<f64>)>,
    pub returns: ReturnTable,
    pub correlation: CorrelationMatrix,
    pub overlap: OverlapMatrix,
    pub sources: Vec<LoadedSource>,
    /// Symbols whose whole chain failed.
    pub failed: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub fetched_at: DateTime<Utc>,
    /// `fetched_at` in the reporting timezone.
    pub last_updated: String,
    pub timezone: String,
}

impl AnalysisReport {
    pub fn source_of(&self, symbol: &str) -> Option<DataSource> {
        self.sources
            .iter()
            .find(|s| s.symbol == symbol)
            .map(|s| s.source)
    }
}

/// Fetch and analyse every configured symbol.
pub fn run_analysis(
    config: &AnalysisConfig,
    registry: &SourceRegistry,
    progress: &dyn FetchProgress,
) -> Result<AnalysisReport, RunError> {
    config.validate()?;
    let tz = config.tz()?;
    let fetched_at = Utc::now();
    let today = fetched_at.with_timezone(&tz).date_naive();
    let (start, end) = config.date_range(today)?;
    let symbols = config.selected_symbols();

    info!(symbols = symbols.len(), %start, %end, "starting analysis");
    let resolutions = fetch_all(&symbols, start, end, registry, config, progress);
    build_report(config, start, end, resolutions, fetched_at)
}

/// Build the report from already-fetched resolutions.
///
/// Fails only when no resolution carries data.
pub fn build_report(
    config: &AnalysisConfig,
    start: NaiveDate,
    end: NaiveDate,
    resolutions: Vec<Resolution>,
    fetched_at: DateTime<Utc>,
) -> Result<AnalysisReport, RunError> {
    let tz = config.tz()?;
    let symbols = config.selected_symbols();

    let series: Vec<PriceSeries> = resolutions
        .iter()
        .filter_map(|r| r.series().cloned())
        .collect();
    let prices = align_series(&series);
    let returns = ReturnTable::from_prices(&prices);
    let (correlation, overlap) = pairwise_correlate(&returns);

    let diagnostics = diagnose(
        &symbols,
        &resolutions,
        &correlation,
        &overlap,
        config.low_correlation_threshold,
        &config.focus_pairs,
    );

    if prices.is_empty() {
        return Err(RunError::NoData {
            requested: symbols,
            diagnostics,
        });
    }

    let sources = resolutions
        .iter()
        .filter_map(|r| {
            let series = r.series()?;
            Some(LoadedSource {
                symbol: r.symbol.clone(),
                source: r.source()?,
                rows: series.len(),
                first_date: series.first_date()?,
                last_date: series.last_date()?,
                filled: prices.column(&r.symbol).map_or(0, |c| c.filled_count()),
            })
        })
        .collect();
    let failed: Vec<String> = resolutions
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| r.symbol.clone())
        .collect();

    info!(
        loaded = prices.column_count(),
        failed = failed.len(),
        rows = prices.row_count(),
        "analysis complete"
    );

    Ok(AnalysisReport {
        schema_version: SCHEMA_VERSION,
        symbols,
        start_date: start,
        end_date: end,
        normalized: prices.normalized(),
        prices,
        returns,
        correlation,
        overlap,
        sources,
        failed,
        diagnostics,
        fetched_at,
        last_updated: fetched_at
            .with_timezone(&tz)
            .format(LAST_UPDATED_FORMAT)
            .to_string(),
        timezone: config.timezone.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cryptoa_core::data::{DataError, FetchOutcome, PricePoint, SourceFailure};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn config(symbols: &[&str]) -> AnalysisConfig {
        AnalysisConfig {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            ..AnalysisConfig::default()
        }
    }

    fn ok(symbol: &str, closes: &[f64]) -> Resolution {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint::new(d(i as u32 + 1), *c));
        Resolution {
            symbol: symbol.into(),
            outcome: FetchOutcome::Success {
                series: PriceSeries::new(symbol, points),
                source: DataSource::YahooFinance,
            },
            failures: vec![],
            chain_len: 1,
        }
    }

    fn failed(symbol: &str) -> Resolution {
        let failure = SourceFailure {
            source: DataSource::YahooFinance,
            error: DataError::Empty("no rows".into()),
            attempts: 1,
            exhausted: false,
        };
        Resolution {
            symbol: symbol.into(),
            outcome: FetchOutcome::Failure(failure.clone()),
            failures: vec![failure],
            chain_len: 1,
        }
    }

    fn noon_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn report_collects_sources_and_failures() {
        let cfg = config(&["A", "B", "C"]);
        let report = build_report(
            &cfg,
            d(1),
            d(5),
            vec![
                ok("A", &[1.0, 2.0, 3.0, 2.0, 1.0]),
                failed("B"),
                ok("C", &[5.0, 4.0, 6.0, 5.0, 7.0]),
            ],
            noon_utc(),
        )
        .unwrap();

        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.prices.column_count(), 2);
        assert_eq!(report.prices.row_count(), 5);
        assert_eq!(report.returns.row_count(), 4);
        assert_eq!(report.failed, vec!["B".to_string()]);
        assert_eq!(report.source_of("A"), Some(DataSource::YahooFinance));
        assert_eq!(report.source_of("B"), None);
        assert_eq!(report.sources[0].first_date, d(1));
        assert_eq!(report.sources[0].last_date, d(5));
        assert_eq!(report.sources[0].filled, 0);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::SourceFailed { symbol, .. } if symbol == "B")));
    }

    #[test]
    fn last_updated_uses_reporting_timezone() {
        let cfg = config(&["A"]);
        let report = build_report(&cfg, d(1), d(3), vec![ok("A", &[1.0, 2.0, 3.0])], noon_utc()).unwrap();
        // Asia/Taipei is UTC+8
        assert_eq!(report.last_updated, "2024-03-05 20:00:00");
        assert_eq!(report.timezone, "Asia/Taipei");
    }

    #[test]
    fn normalized_trend_starts_at_100() {
        let cfg = config(&["A"]);
        let report = build_report(&cfg, d(1), d(3), vec![ok("A", &[50.0, 75.0, 100.0])], noon_utc()).unwrap();
        assert_eq!(report.normalized[0].0, "A");
        assert_eq!(report.normalized[0].1, vec![100.0, 150.0, 200.0]);
    }

    #[test]
    fn loaded_source_reports_coverage_and_filled_cells() {
        let cfg = config(&["A", "B"]);
        let sparse = Resolution {
            symbol: "B".into(),
            outcome: FetchOutcome::Success {
                series: PriceSeries::new(
                    "B",
                    vec![PricePoint::new(d(2), 10.0), PricePoint::new(d(4), 11.0)],
                ),
                source: DataSource::CoinGecko,
            },
            failures: vec![],
            chain_len: 1,
        };
        let report = build_report(
            &cfg,
            d(1),
            d(5),
            vec![ok("A", &[1.0, 2.0, 3.0, 2.0, 1.0]), sparse],
            noon_utc(),
        )
        .unwrap();

        let b = &report.sources[1];
        assert_eq!(b.symbol, "B");
        assert_eq!(b.rows, 2);
        assert_eq!((b.first_date, b.last_date), (d(2), d(4)));
        // d1 back-filled, d3 and d5 forward-filled
        assert_eq!(b.filled, 3);
    }

    #[test]
    fn nothing_loaded_is_no_data() {
        let cfg = config(&["A", "B"]);
        let err = build_report(&cfg, d(1), d(3), vec![failed("A"), failed("B")], noon_utc()).unwrap_err();
        match err {
            RunError::NoData {
                requested,
                diagnostics,
            } => {
                assert_eq!(requested, vec!["A".to_string(), "B".to_string()]);
                assert_eq!(
                    diagnostics
                        .iter()
                        .filter(|d| matches!(d, Diagnostic::SourceFailed { .. }))
                        .count(),
                    2
                );
            }
            other => panic!("expected NoData, got {other:?}"),
        }
    }

    #[test]
    fn run_rejects_empty_selection_before_fetching() {
        use cryptoa_core::data::YahooProvider;
        use std::sync::Arc;

        let registry = SourceRegistry::new(Arc::new(YahooProvider::default()));
        let cfg = config(&[" "]);
        let err = run_analysis(&cfg, &registry, &crate::data_loader::SilentProgress).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::NoSymbols)));
        assert!(err.to_string().contains("please select at least one asset"));
    }
}
