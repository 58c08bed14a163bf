//! Per-symbol fetching for the runner.
//!
//! Each symbol resolves through its own source chain with no state shared
//! between symbols, so a symbol's fetch is an independent unit. By default
//! symbols are fetched one after another; with `parallelism > 1` a bounded
//! rayon pool runs several chains at once. Output order always follows the
//! configured symbol order.

use crate::config::AnalysisConfig;
use crate::sources::SourceRegistry;
use chrono::NaiveDate;
use cryptoa_core::data::{resolve, Resolution};
use rayon::prelude::*;
use tracing::{info, warn};

/// Progress callback for multi-symbol fetches.
pub trait FetchProgress: Send + Sync {
    /// Called when starting to fetch a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol's chain has been walked.
    fn on_complete(&self, resolution: &Resolution, index: usize, total: usize);

    /// Called when every symbol is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Reports progress through `tracing`.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        info!("[{}/{}] fetching {symbol}", index + 1, total);
    }

    fn on_complete(&self, resolution: &Resolution, _index: usize, _total: usize) {
        match resolution.source() {
            Some(source) => info!(symbol = %resolution.symbol, %source, "ok"),
            None => warn!(
                symbol = %resolution.symbol,
                path = %resolution.fallback_path(),
                "failed"
            ),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        info!("fetch complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Discards progress.
pub struct SilentProgress;

impl FetchProgress for SilentProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}
    fn on_complete(&self, _resolution: &Resolution, _index: usize, _total: usize) {}
    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}

/// Fetch one symbol through its chain.
pub fn fetch_symbol(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    registry: &SourceRegistry,
    config: &AnalysisConfig,
) -> Resolution {
    let chain = registry.chain_for(symbol, config);
    resolve(symbol, start, end, &chain)
}

/// Fetch every symbol, in order.
pub fn fetch_all(
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    registry: &SourceRegistry,
    config: &AnalysisConfig,
    progress: &dyn FetchProgress,
) -> Vec<Resolution> {
    let total = symbols.len();
    let fetch_one = |(index, symbol): (usize, &String)| {
        progress.on_start(symbol, index, total);
        let resolution = fetch_symbol(symbol, start, end, registry, config);
        progress.on_complete(&resolution, index, total);
        resolution
    };

    let resolutions: Vec<Resolution> = if config.parallelism > 1 && total > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallelism.min(total))
            .build()
        {
            Ok(pool) => pool.install(|| symbols.par_iter().enumerate().map(fetch_one).collect()),
            Err(e) => {
                warn!(error = %e, "could not start fetch pool, fetching sequentially");
                symbols.iter().enumerate().map(fetch_one).collect()
            }
        }
    } else {
        symbols.iter().enumerate().map(fetch_one).collect()
    };

    let succeeded = resolutions.iter().filter(|r| r.is_success()).count();
    progress.on_batch_complete(succeeded, total - succeeded, total);
    resolutions
}
