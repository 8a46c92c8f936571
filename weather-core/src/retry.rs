//! Exponential backoff for forecast requests.
//!
//! Timeouts, connection failures, 5xx, 408 and 429 are retried.
//! Other 4xx responses are returned to the caller immediately.

use std::{future::Future, time::Duration};

use reqwest::{Response, StatusCode};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_MS)
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

pub fn is_retryable_error(error: &reqwest::Error) -> RetryDecision {
    if error.is_timeout() || error.is_connect() {
        return RetryDecision::Retry;
    }

    match error.status() {
        Some(status) if !error.is_request() => is_retryable_status(status),
        _ => RetryDecision::NoRetry,
    }
}

pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        RetryDecision::Retry
    } else {
        RetryDecision::NoRetry
    }
}

/// Run `operation` until it yields a non-retryable outcome or retries run out.
///
/// A retryable status on the last attempt is returned as `Ok` so the caller
/// can still inspect the body.
pub async fn with_retry<F, Fut>(config: &RetryConfig, operation: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;

    loop {
        let last = attempt >= config.max_retries;

        match operation().await {
            Ok(response) => {
                let status = response.status();
                if last || is_retryable_status(status) == RetryDecision::NoRetry {
                    if attempt > 0 {
                        tracing::debug!(attempt, %status, "Request finished after retries");
                    }
                    return Ok(response);
                }

                tracing::warn!(
                    %status,
                    attempt = attempt + 1,
                    total = config.max_retries + 1,
                    "Retryable status"
                );
            }
            Err(err) => {
                if is_retryable_error(&err) == RetryDecision::NoRetry {
                    return Err(err);
                }
                if last {
                    tracing::error!(attempts = attempt + 1, error = %err, "All retry attempts exhausted");
                    return Err(err);
                }

                tracing::warn!(
                    error = %err,
                    attempt = attempt + 1,
                    total = config.max_retries + 1,
                    "Retryable request error"
                );
            }
        }

        tokio::time::sleep(config.delay_for_attempt(attempt)).await;
        attempt += 1;
    }
}
