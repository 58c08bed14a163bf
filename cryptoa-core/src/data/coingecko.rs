//! CoinGecko market-chart provider (tertiary client).
//!
//! Price-only: the `market_chart` endpoint returns `[epoch_ms, price]` pairs
//! for the last `days` days counted back from now, not from the window end,
//! so a historical window asks for enough days to reach its start and the
//! response is clipped afterwards. Several points can land on the same calendar
//! day (the latest one is an intraday snapshot); the first is kept.

use super::http;
use super::provider::{DataError, DataProvider, DataSource, PricePoint, PriceSeries};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<[f64; 2]>,
}

/// CoinGecko data provider. Symbols are CoinGecko coin ids (`bitcoin`).
#[derive(Debug, Clone)]
pub struct CoinGeckoProvider {
    timeout: Duration,
}

impl CoinGeckoProvider {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Number of daily points to request for an inclusive range.
    pub fn day_count(start: NaiveDate, end: NaiveDate) -> i64 {
        ((end - start).num_days() + 1).max(1)
    }

    /// `today` anchors the endpoint's trailing window.
    fn chart_url(coin_id: &str, start: NaiveDate, end: NaiveDate, today: NaiveDate) -> String {
        format!(
            "{BASE_URL}/coins/{coin_id}/market_chart?vs_currency=usd&days={}&interval=daily",
            Self::day_count(start, end.max(today))
        )
    }
}

impl Default for CoinGeckoProvider {
    fn default() -> Self {
        Self::new(http::DEFAULT_TIMEOUT)
    }
}

/// Parse a `market_chart` body into a series clipped to `[start, end]`.
pub fn parse_market_chart(
    symbol: &str,
    body: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, DataError> {
    let chart: MarketChart = serde_json::from_str(body).map_err(|e| {
        DataError::SchemaError(format!("failed to parse market chart for {symbol}: {e}"))
    })?;

    if chart.prices.is_empty() {
        return Err(DataError::Empty(format!("empty price list for {symbol}")));
    }

    let mut points = Vec::with_capacity(chart.prices.len());
    for [millis, price] in chart.prices {
        let date = DateTime::from_timestamp_millis(millis as i64)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| DataError::SchemaError(format!("invalid timestamp: {millis}")))?;
        points.push(PricePoint::new(date, price));
    }

    let series = PriceSeries::new(symbol, points).within(start, end);
    if series.is_empty() {
        return Err(DataError::Empty(format!(
            "no prices for {symbol} between {start} and {end}"
        )));
    }
    Ok(series)
}

impl DataProvider for CoinGeckoProvider {
    fn source(&self) -> DataSource {
        DataSource::CoinGecko
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let url = Self::chart_url(symbol, start, end, Utc::now().date_naive());
        debug!(%symbol, %url, "requesting coingecko market chart");

        let (status, body) = http::get(self.timeout, &url)?;
        if status != 200 {
            return Err(DataError::HttpError(status));
        }

        parse_market_chart(symbol, &body, start, end)
    }
}
