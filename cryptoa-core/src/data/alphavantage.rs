//! Alpha Vantage digital-currency provider (secondary client).
//!
//! Uses `DIGITAL_CURRENCY_DAILY` with `market=USD`. The provider has renamed
//! its close field more than once (`4a. close (USD)`, `4b. close (USD)`, ...)
//! so the column is located by probing field names instead of a fixed key.
//! Throttling arrives as a 200 with a `Note`/`Information` text field, not as
//! an HTTP status.

use super::http;
use super::provider::{DataError, DataProvider, DataSource, PricePoint, PriceSeries};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Payload keys Alpha Vantage uses to report errors and soft limits.
const NOTICE_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

/// Alpha Vantage data provider.
#[derive(Clone)]
pub struct AlphaVantageProvider {
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for AlphaVantageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageProvider")
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AlphaVantageProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            timeout,
        }
    }

    fn query_url(&self, symbol: &str) -> String {
        format!(
            "{BASE_URL}?function=DIGITAL_CURRENCY_DAILY&symbol={symbol}&market=USD&apikey={}",
            self.api_key
        )
    }
}

/// Find the close-in-USD column among a row's field names.
///
/// Matching is case-insensitive on both substrings; the first match in key
/// order wins.
pub fn find_close_usd_field<'a>(fields: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    fields.into_iter().find(|name| {
        let lower = name.to_ascii_lowercase();
        lower.contains("close") && lower.contains("usd")
    })
}

fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn time_series(obj: &Map<String, Value>) -> Option<&Map<String, Value>> {
    obj.iter()
        .find(|(key, _)| key.starts_with("Time Series"))
        .and_then(|(_, value)| value.as_object())
}

/// Parse a `DIGITAL_CURRENCY_DAILY` body into a series clipped to `[start, end]`.
pub fn parse_daily(
    symbol: &str,
    body: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, DataError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        DataError::SchemaError(format!("failed to parse alpha vantage response: {e}"))
    })?;
    let obj = value
        .as_object()
        .ok_or_else(|| DataError::SchemaError("expected a JSON object".into()))?;

    for key in NOTICE_KEYS {
        if let Some(notice) = obj.get(key) {
            let message = notice
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| notice.to_string());
            return Err(DataError::ProviderError(format!("{key}: {message}")));
        }
    }

    let rows = time_series(obj)
        .ok_or_else(|| DataError::SchemaError("missing \"Time Series\" object".into()))?;
    if rows.is_empty() {
        return Err(DataError::Empty(format!("no rows for {symbol}")));
    }

    let close_field = rows
        .values()
        .find_map(|row| row.as_object())
        .and_then(|row| find_close_usd_field(row.keys().map(String::as_str)))
        .map(str::to_string)
        .ok_or_else(|| DataError::SchemaError("no close-in-USD field in time series".into()))?;

    let mut points = Vec::with_capacity(rows.len());
    for (date_str, row) in rows {
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|e| DataError::SchemaError(format!("invalid date key {date_str:?}: {e}")))?;
        let close = row
            .get(&close_field)
            .and_then(parse_price)
            .ok_or_else(|| {
                DataError::SchemaError(format!("non-numeric {close_field:?} on {date_str}"))
            })?;
        points.push(PricePoint::new(date, close));
    }

    let series = PriceSeries::new(symbol, points).within(start, end);
    if series.is_empty() {
        return Err(DataError::Empty(format!(
            "no rows for {symbol} between {start} and {end}"
        )));
    }
    Ok(series)
}

impl DataProvider for AlphaVantageProvider {
    fn source(&self) -> DataSource {
        DataSource::AlphaVantage
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        debug!(%symbol, "requesting alpha vantage DIGITAL_CURRENCY_DAILY");

        let (status, body) = http::get(self.timeout, &self.query_url(symbol))?;
        if status != 200 {
            return Err(DataError::HttpError(status));
        }

        parse_daily(symbol, &body, start, end)
    }
}
