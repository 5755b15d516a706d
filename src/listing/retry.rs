//! Retry with exponential backoff for page fetches

use crate::config::RetryConfig;
use crate::listing::{FetchError, ListingPage, PageSource};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounded retry settings for one page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base: Duration::ZERO,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }
}

/// Exponential backoff: base * 2^(attempt-1) (base, 2*base, 4*base, ...)
pub fn backoff_duration(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor)
}

/// Fetches one page, retrying retryable failures with exponential backoff
///
/// Gives up early once `stopping` is cancelled: a stopping run discards the
/// page anyway, so there is nothing to wait for.
///
/// Returns `Ok(page)` on first success, or the final `Err` on exhaustion,
/// non-retryable error, or stop.
pub async fn fetch_with_retry(
    source: &dyn PageSource,
    cursor: Option<&str>,
    policy: RetryPolicy,
    stopping: &CancellationToken,
) -> Result<ListingPage, FetchError> {
    let mut attempt = 0u32;
    loop {
        match source.fetch_page(cursor).await {
            Ok(page) => return Ok(page),
            Err(e) if attempt < policy.max_retries && e.is_retryable() && !stopping.is_cancelled() => {
                attempt += 1;
                tracing::debug!(
                    "Page fetch attempt {}/{} failed: {}, retrying...",
                    attempt,
                    policy.max_retries,
                    e
                );
                tokio::select! {
                    _ = tokio::time::sleep(backoff_duration(policy.backoff_base, attempt)) => {}
                    _ = stopping.cancelled() => return Err(e),
                }
            }
            Err(e) => {
                tracing::error!("Page fetch failed permanently: {}", e);
                return Err(e);
            }
        }
    }
}
