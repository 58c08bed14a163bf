//! Per-request blocking HTTP plumbing shared by the source clients.
//!
//! Every fetch builds its own client so no connection outlives a single
//! request; the timeout bounds how long one provider can stall a run.

use super::provider::DataError;
use std::time::Duration;

/// Default bound on a single provider request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Build a one-shot client for a single request.
pub(crate) fn client(timeout: Duration) -> Result<reqwest::blocking::Client, DataError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .pool_max_idle_per_host(0)
        .build()
        .map_err(|e| DataError::NetworkError(format!("failed to build HTTP client: {e}")))
}

/// Issue a GET and return the status code with the raw body.
pub(crate) fn get(timeout: Duration, url: &str) -> Result<(u16, String), DataError> {
    let response = client(timeout)?.get(url).send().map_err(transport_error)?;
    let status = response.status().as_u16();
    let body = response.text().map_err(transport_error)?;
    Ok((status, body))
}

/// Classify a transport-level failure. The URL is stripped since it may
/// carry an API key.
pub(crate) fn transport_error(e: reqwest::Error) -> DataError {
    let e = e.without_url();
    if e.is_timeout() {
        DataError::NetworkError(format!("request timed out: {e}"))
    } else if e.is_decode() {
        DataError::SchemaError(format!("failed to decode body: {e}"))
    } else {
        DataError::NetworkError(e.to_string())
    }
}
