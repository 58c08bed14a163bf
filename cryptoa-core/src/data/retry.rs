//! Bounded retry with a fixed delay between transient failures.
//!
//! Retry eligibility is decided by the failure's classification: only
//! `NetworkError` and `RateLimited` are attempted again. Everything else is
//! returned on first occurrence.

use super::provider::DataError;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Retry configuration for a single source call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// The failure a retried operation ended with.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryFailure {
    pub error: DataError,
    /// Attempts actually made.
    pub attempts: u32,
    /// True when every allowed attempt failed with a retryable error.
    pub exhausted: bool,
}

impl RetryFailure {
    /// A failure from an operation that was attempted exactly once.
    pub fn single(error: DataError) -> Self {
        Self {
            error,
            attempts: 1,
            exhausted: false,
        }
    }
}

impl fmt::Display for RetryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exhausted {
            write!(f, "{} (gave up after {} attempts)", self.error, self.attempts)
        } else {
            write!(f, "{}", self.error)
        }
    }
}

impl std::error::Error for RetryFailure {}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op`, blocking the calling thread for `delay` between retryable
    /// failures. `op` receives the 1-based attempt number.
    pub fn run<T, F>(&self, op: F) -> Result<T, RetryFailure>
    where
        F: FnMut(u32) -> Result<T, DataError>,
    {
        self.run_with_sleep(op, std::thread::sleep)
    }

    /// Same as [`run`](Self::run) with an explicit sleep function.
    pub fn run_with_sleep<T, F, S>(&self, mut op: F, mut sleep: S) -> Result<T, RetryFailure>
    where
        F: FnMut(u32) -> Result<T, DataError>,
        S: FnMut(Duration),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_retryable() => {
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                        exhausted: false,
                    });
                }
                Err(error) if attempt >= max_attempts => {
                    warn!(attempt, %error, "retries exhausted");
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                        exhausted: true,
                    });
                }
                Err(error) => {
                    warn!(
                        attempt,
                        max_attempts,
                        delay_secs = self.delay.as_secs_f64(),
                        %error,
                        "transient failure, retrying"
                    );
                    sleep(self.delay);
                    attempt += 1;
                }
            }
        }
    }
}
