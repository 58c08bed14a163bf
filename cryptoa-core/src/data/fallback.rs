//! Per-symbol source fallback chain.
//!
//! A chain is an ordered list of providers eligible for one symbol. Most
//! symbols have a single link (the primary client); assets with unreliable
//! primary coverage get alternates. The order encodes preference only: every
//! link must supply the same quantity, the daily USD close.

use super::provider::{DataError, DataProvider, DataSource, ErrorKind, PriceSeries};
use super::retry::{RetryFailure, RetryPolicy};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One provider in a chain, with the identifier it knows the asset under.
#[derive(Clone)]
pub struct ChainLink {
    provider: Arc<dyn DataProvider>,
    remote_symbol: String,
    retry: Option<RetryPolicy>,
}

impl ChainLink {
    /// A link attempted exactly once.
    pub fn new(provider: Arc<dyn DataProvider>, remote_symbol: impl Into<String>) -> Self {
        Self {
            provider,
            remote_symbol: remote_symbol.into(),
            retry: None,
        }
    }

    /// Wrap this link's call in a retry policy.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn source(&self) -> DataSource {
        self.provider.source()
    }

    pub fn remote_symbol(&self) -> &str {
        &self.remote_symbol
    }

    pub fn retry(&self) -> Option<RetryPolicy> {
        self.retry
    }

    fn attempt(&self, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries, RetryFailure> {
        let fetch = |_attempt: u32| self.provider.fetch(&self.remote_symbol, start, end);
        let series = match self.retry {
            Some(policy) => policy.run(fetch),
            None => fetch(1).map_err(RetryFailure::single),
        }?;
        // A success without rows is still a missing column downstream
        if series.is_empty() {
            return Err(RetryFailure::single(DataError::Empty(format!(
                "{} returned no rows for {}",
                self.source().name(),
                self.remote_symbol
            ))));
        }
        Ok(series)
    }
}

impl fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainLink")
            .field("source", &self.source())
            .field("remote_symbol", &self.remote_symbol)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Ordered, non-empty list of links for one symbol.
#[derive(Debug, Clone)]
pub struct SourceChain {
    links: Vec<ChainLink>,
}

impl SourceChain {
    /// A chain always starts from its most preferred link.
    pub fn new(first: ChainLink) -> Self {
        Self { links: vec![first] }
    }

    /// Append a lower-preference link.
    pub fn then(mut self, link: ChainLink) -> Self {
        self.links.push(link);
        self
    }

    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// `yahoo_finance(BTC-USD) → alpha_vantage(BTC) → coingecko(bitcoin)`
    pub fn describe(&self) -> String {
        self.links
            .iter()
            .map(|l| format!("{}({})", l.source().name(), l.remote_symbol()))
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

/// A failed attempt against one link of a chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub source: DataSource,
    pub error: DataError,
    pub attempts: u32,
    pub exhausted: bool,
}

impl SourceFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    fn from_retry(source: DataSource, failure: RetryFailure) -> Self {
        Self {
            source,
            error: failure.error,
            attempts: failure.attempts,
            exhausted: failure.exhausted,
        }
    }
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.source.tier(), self.error.kind())?;
        if self.exhausted {
            write!(f, " after {} attempts", self.attempts)?;
        }
        Ok(())
    }
}

/// Tagged result of fetching one symbol.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success {
        series: PriceSeries,
        source: DataSource,
    },
    /// The last failure of the chain: the most specific fallback outcome.
    Failure(SourceFailure),
}

/// Everything the resolver learned about one symbol.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub symbol: String,
    pub outcome: FetchOutcome,
    /// Failures in chain order, including the terminal one on failure.
    pub failures: Vec<SourceFailure>,
    /// Links in the chain that was walked.
    pub chain_len: usize,
}

impl Resolution {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Success { .. })
    }

    pub fn series(&self) -> Option<&PriceSeries> {
        match &self.outcome {
            FetchOutcome::Success { series, .. } => Some(series),
            FetchOutcome::Failure(_) => None,
        }
    }

    pub fn source(&self) -> Option<DataSource> {
        match &self.outcome {
            FetchOutcome::Success { source, .. } => Some(*source),
            FetchOutcome::Failure(_) => None,
        }
    }

    /// `primary failed: rate limited after 3 attempts → secondary failed: schema error`
    pub fn fallback_path(&self) -> String {
        self.failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" → ")
    }

    pub fn into_series(self) -> Option<PriceSeries> {
        match self.outcome {
            FetchOutcome::Success { series, .. } => Some(series),
            FetchOutcome::Failure(_) => None,
        }
    }
}

/// Walk `chain` in order until one link yields a series.
///
/// The returned series is keyed by `symbol` regardless of the identifier the
/// winning provider used.
pub fn resolve(symbol: &str, start: NaiveDate, end: NaiveDate, chain: &SourceChain) -> Resolution {
    let mut failures = Vec::new();

    for link in chain.links() {
        let source = link.source();
        debug!(%symbol, %source, remote = link.remote_symbol(), "trying source");

        match link.attempt(start, end) {
            Ok(series) => {
                info!(%symbol, %source, rows = series.len(), "loaded");
                return Resolution {
                    symbol: symbol.to_string(),
                    outcome: FetchOutcome::Success {
                        series: series.relabel(symbol),
                        source,
                    },
                    failures,
                    chain_len: chain.len(),
                };
            }
            Err(failure) => {
                let failure = SourceFailure::from_retry(source, failure);
                warn!(%symbol, %source, error = %failure.error, "source failed");
                failures.push(failure);
            }
        }
    }

    let last = match failures.last() {
        Some(last) => last.clone(),
        None => unreachable!("a source chain always holds at least one link"),
    };
    let resolution = Resolution {
        symbol: symbol.to_string(),
        outcome: FetchOutcome::Failure(last),
        failures,
        chain_len: chain.len(),
    };
    warn!(%symbol, path = %resolution.fallback_path(), "all sources failed");
    resolution
}
