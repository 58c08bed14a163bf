//! Data provider trait, price series model, and structured fetch errors.
//!
//! The DataProvider trait abstracts over the upstream sources (Yahoo Finance,
//! Alpha Vantage, CoinGecko) so fallback chains can be assembled per symbol
//! and mocked for tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// One daily closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Daily closing prices for one symbol, strictly increasing by date.
///
/// Construction is the only way in: once built a series is only read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from raw provider rows.
    ///
    /// Non-finite closes are dropped, duplicate dates keep the first
    /// occurrence in provider order, and the result is sorted ascending.
    pub fn new(symbol: impl Into<String>, raw: impl IntoIterator<Item = PricePoint>) -> Self {
        let mut seen = HashSet::new();
        let mut points: Vec<PricePoint> = raw
            .into_iter()
            .filter(|p| p.close.is_finite())
            .filter(|p| seen.insert(p.date))
            .collect();
        points.sort_by_key(|p| p.date);

        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Keep only points inside `[start, end]`.
    pub fn within(self, start: NaiveDate, end: NaiveDate) -> Self {
        let points = self
            .points
            .into_iter()
            .filter(|p| p.date >= start && p.date <= end)
            .collect();
        Self {
            symbol: self.symbol,
            points,
        }
    }

    /// Re-key the series under the configured symbol (providers may know the
    /// asset under a different identifier, e.g. `bitcoin` for `BTC-USD`).
    pub fn relabel(self, symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            points: self.points,
        }
    }
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    AlphaVantage,
    CoinGecko,
}

impl DataSource {
    /// Stable machine name, used in logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::YahooFinance => "yahoo_finance",
            Self::AlphaVantage => "alpha_vantage",
            Self::CoinGecko => "coingecko",
        }
    }

    /// Position of the source in the preference order.
    pub fn tier(self) -> &'static str {
        match self {
            Self::YahooFinance => "primary",
            Self::AlphaVantage => "secondary",
            Self::CoinGecko => "tertiary",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} client ({})", self.tier(), self.name())
    }
}

/// Classification of a failed fetch. Drives retry eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NetworkError,
    RateLimited,
    HttpError,
    SchemaError,
    ProviderError,
    Empty,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NetworkError => "network error",
            Self::RateLimited => "rate limited",
            Self::HttpError => "http error",
            Self::SchemaError => "schema error",
            Self::ProviderError => "provider error",
            Self::Empty => "empty response",
        };
        f.write_str(s)
    }
}

/// Structured error types for a single source fetch.
///
/// Displayable in CLI output and diagnostics alike.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DataError {
    #[error("network error: {0}")]
    NetworkError(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("HTTP status {0}")]
    HttpError(u16),

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("empty response: {0}")]
    Empty(String),
}

impl DataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NetworkError(_) => ErrorKind::NetworkError,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::HttpError(_) => ErrorKind::HttpError,
            Self::SchemaError(_) => ErrorKind::SchemaError,
            Self::ProviderError(_) => ErrorKind::ProviderError,
            Self::Empty(_) => ErrorKind::Empty,
        }
    }

    /// Only transport failures and throttling are worth another attempt.
    /// A structurally wrong response will be just as wrong next time.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::NetworkError | ErrorKind::RateLimited)
    }
}

/// Trait for price data providers.
///
/// Implementations handle the wire format of one upstream API and return a
/// series keyed by whatever identifier they were asked for. Retrying and
/// falling back are the caller's business.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str {
        self.source().name()
    }

    /// Which upstream this provider talks to.
    fn source(&self) -> DataSource;

    /// Fetch daily closes for `symbol` over the inclusive range `[start, end]`.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn series_sorts_and_keeps_first_duplicate() {
        let series = PriceSeries::new(
            "BTC-USD",
            vec![
                PricePoint::new(d("2024-01-03"), 3.0),
                PricePoint::new(d("2024-01-01"), 1.0),
                PricePoint::new(d("2024-01-03"), 99.0),
                PricePoint::new(d("2024-01-02"), 2.0),
            ],
        );

        let closes: Vec<f64> = series.points().iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
        assert_eq!(series.first_date(), Some(d("2024-01-01")));
        assert_eq!(series.last_date(), Some(d("2024-01-03")));
    }

    #[test]
    fn series_drops_non_finite_closes() {
        let series = PriceSeries::new(
            "SPY",
            vec![
                PricePoint::new(d("2024-01-01"), f64::NAN),
                PricePoint::new(d("2024-01-01"), 470.0),
            ],
        );
        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0].close, 470.0);
    }

    #[test]
    fn within_is_inclusive() {
        let series = PriceSeries::new(
            "SPY",
            (1..=5).map(|day| PricePoint::new(d(&format!("2024-01-0{day}")), day as f64)),
        );
        let trimmed = series.within(d("2024-01-02"), d("2024-01-04"));
        assert_eq!(trimmed.len(), 3);
    }

    #[test]
    fn only_network_and_rate_limit_are_retryable() {
        assert!(DataError::NetworkError("timeout".into()).is_retryable());
        assert!(DataError::RateLimited("429".into()).is_retryable());
        assert!(!DataError::HttpError(500).is_retryable());
        assert!(!DataError::SchemaError("x".into()).is_retryable());
        assert!(!DataError::ProviderError("x".into()).is_retryable());
        assert!(!DataError::Empty("x".into()).is_retryable());
    }

    #[test]
    fn source_display_names_tier() {
        assert_eq!(
            DataSource::AlphaVantage.to_string(),
            "secondary client (alpha_vantage)"
        );
    }
}
