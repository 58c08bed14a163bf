//! Yahoo Finance data provider (primary client).
//!
//! Fetches daily closes from Yahoo's v8 chart API. Yahoo has no official API
//! and throttles aggressively; both 429 and 403 are reported as rate limiting
//! so the retry policy can back off.

use super::http;
use super::provider::{DataError, DataProvider, DataSource, PricePoint, PriceSeries};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
#[derive(Debug, Clone)]
pub struct YahooProvider {
    timeout: Duration,
}

impl YahooProvider {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Build the chart API URL for a symbol and inclusive date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp() + 86_399;
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new(http::DEFAULT_TIMEOUT)
    }
}

/// Parse a chart API body into a close-price series.
///
/// Each timestamp is shifted by the exchange's GMT offset before the time of
/// day is stripped, so a session that opens at 09:30 New York lands on its
/// own calendar day rather than the UTC one.
pub fn parse_chart(symbol: &str, body: &str) -> Result<PriceSeries, DataError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        DataError::SchemaError(format!("failed to parse chart response for {symbol}: {e}"))
    })?;

    if let Some(err) = resp.chart.error {
        return Err(DataError::ProviderError(format!(
            "{}: {}",
            err.code, err.description
        )));
    }

    let data = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| DataError::Empty(format!("no chart result for {symbol}")))?;

    let timestamps = data.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        return Err(DataError::Empty(format!("no rows for {symbol}")));
    }

    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .ok_or_else(|| DataError::SchemaError("no quote block in chart response".into()))?;

    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    let mut points = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        // Null closes are holidays or halted sessions
        let Some(close) = closes.get(i).copied().flatten() else {
            continue;
        };
        let date = DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| DataError::SchemaError(format!("invalid timestamp: {ts}")))?;
        points.push(PricePoint::new(date, close));
    }

    let series = PriceSeries::new(symbol, points);
    if series.is_empty() {
        return Err(DataError::Empty(format!("no close prices for {symbol}")));
    }
    Ok(series)
}

/// Classify a non-success chart response.
fn classify_status(status: u16, body: &str) -> DataError {
    match status {
        429 | 403 => DataError::RateLimited(format!("yahoo returned HTTP {status}")),
        _ => match serde_json::from_str::<ChartResponse>(body) {
            Ok(ChartResponse {
                chart:
                    ChartResult {
                        error: Some(err), ..
                    },
            }) => DataError::ProviderError(format!("{}: {}", err.code, err.description)),
            _ => DataError::HttpError(status),
        },
    }
}

impl DataProvider for YahooProvider {
    fn source(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let url = Self::chart_url(symbol, start, end);
        debug!(%symbol, %url, "requesting yahoo chart");

        let (status, body) = http::get(self.timeout, &url)?;
        if !(200..300).contains(&status) {
            return Err(classify_status(status, &body));
        }

        parse_chart(symbol, &body)
    }
}
