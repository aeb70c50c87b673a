//! Automatic retries for individual HTTP calls.
//!
//! [`with_retries`] wraps one logical request: it re-issues the call on
//! transient failures with exponential backoff plus jitter, lets a
//! `Retry-After` header override the computed delay, and hands back the last
//! attempt once the budget is spent.

use crate::error::{Error, Result};
use crate::transport::HttpResponse;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Configuration for exponential-backoff retries of a single HTTP call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base delay in milliseconds; doubled on each subsequent retry.
    pub base_interval_ms: u64,
    /// Upper bound (inclusive) of the random delay added to every backoff.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_interval_ms: 500,
            jitter_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether a response with `status` should be retried.
    ///
    /// Rate limiting (429) is always retried; server errors (5xx) only when the
    /// request is idempotent.
    pub fn should_retry(&self, idempotent: bool, status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || (idempotent && status.is_server_error())
    }

    /// Deterministic part of the delay before retry number `attempt + 1`
    /// (0-based): `base_interval_ms * 2^attempt`, saturating.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_interval_ms.saturating_mul(factor))
    }

    /// Full delay for the 0-based `attempt`, including a random jitter draw in
    /// `0..=jitter_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=self.jitter_ms)
        };
        self.base_backoff(attempt) + Duration::from_millis(jitter)
    }
}

/// Interpret a `Retry-After` header value relative to `now`.
///
/// Accepts either a non-negative integer number of seconds or an HTTP date.
/// Dates in the past yield a zero delay; anything else yields `None`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - now;
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

/// Run `call` until it succeeds, fails permanently, or the retry budget of
/// `policy` is exhausted.
///
/// `call` is invoked once per attempt and must produce a fresh request each
/// time. Retried responses are dropped unread. The final attempt is returned
/// as-is (success, error status, or transport error); mapping statuses to
/// errors is left to the caller.
pub async fn with_retries<F, Fut>(
    policy: &RetryPolicy,
    idempotent: bool,
    mut call: F,
) -> Result<HttpResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<HttpResponse>>,
{
    let mut attempt = 0u32;
    loop {
        let result = call().await;
        if attempt >= policy.max_retries {
            return result;
        }

        let retry = match &result {
            Ok(response) if policy.should_retry(idempotent, response.status()) => {
                let delay = response
                    .header_str(RETRY_AFTER.as_str())
                    .and_then(|v| parse_retry_after(v, Utc::now()))
                    .unwrap_or_else(|| policy.backoff(attempt));
                Some((delay, response.status().to_string()))
            }
            Err(e @ Error::Transport(_)) if idempotent => {
                Some((policy.backoff(attempt), e.to_string()))
            }
            _ => None,
        };
        let Some((delay, reason)) = retry else {
            return result;
        };

        tracing::warn!(
            attempt = attempt + 1,
            max_retries = policy.max_retries,
            backoff_ms = delay.as_millis(),
            reason = %reason,
            "Retrying request"
        );
        metrics::counter!("replicate_client.http.retries_total").increment(1);

        drop(result);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
