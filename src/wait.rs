//! Poll-until-terminal coordination.
//!
//! [`wait_for`] turns a fire-and-forget job into a single awaitable value: it
//! re-fetches the job on an interval until the status is terminal, backs off
//! on transient fetch errors, and gives up after a configurable number of
//! polls.

use crate::error::{Error, Result};
use crate::job::Job;
use crate::status::JobStatus;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Longest server-side block a `Prefer: wait=N` header may request.
pub const MAX_BLOCK_SECONDS: u32 = 60;

/// Delay before the next poll after `errors` consecutive transient failures.
pub type BackoffFn = fn(u32) -> Duration;

/// `2^errors * 100 ms`, saturating.
pub fn default_backoff(errors: u32) -> Duration {
    let factor = 2u64.checked_pow(errors).unwrap_or(u64::MAX);
    Duration::from_millis(factor.saturating_mul(100))
}

fn default_backoff_fn() -> BackoffFn {
    default_backoff
}

/// How a newly created job is awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitMode {
    /// Create, then poll. This is the default.
    #[default]
    Poll,
    /// Ask the server to hold the creation response until the job finishes or
    /// `seconds` elapse (server default when `None`). The returned job is still
    /// polled if it is not terminal yet.
    Block { seconds: Option<u32> },
}

impl WaitMode {
    /// Value of the `Prefer` header for a creation request, if any.
    ///
    /// Fails with [`Error::Validation`] when `seconds` is outside
    /// `1..=`[`MAX_BLOCK_SECONDS`].
    pub fn prefer_header(&self) -> Result<Option<String>> {
        match self {
            Self::Poll => Ok(None),
            Self::Block { seconds: None } => Ok(Some("wait".to_string())),
            Self::Block { seconds: Some(n) } if (1..=MAX_BLOCK_SECONDS).contains(n) => {
                Ok(Some(format!("wait={}", n)))
            }
            Self::Block { seconds: Some(n) } => Err(Error::Validation(format!(
                "Wait must be between 1 and {} seconds, got {}",
                MAX_BLOCK_SECONDS, n
            ))),
        }
    }
}

/// Polling policy for [`wait_for`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Delay between polls while fetches succeed.
    pub interval_ms: u64,
    /// Maximum number of polls (fetches after creation). Unbounded when `None`.
    pub max_attempts: Option<u32>,
    pub mode: WaitMode,
    /// Delay after consecutive transient fetch errors.
    #[serde(skip, default = "default_backoff_fn")]
    pub backoff: BackoffFn,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval_ms: 250,
            max_attempts: None,
            mode: WaitMode::Poll,
            backoff: default_backoff,
        }
    }
}

impl WaitOptions {
    /// Default polling, but with the creation request blocking server-side.
    pub fn block(seconds: Option<u32>) -> Self {
        Self {
            mode: WaitMode::Block { seconds },
            ..Self::default()
        }
    }

    pub fn interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn backoff(mut self, backoff: BackoffFn) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Poll `job` until it reaches a terminal status.
///
/// - `on_update` is called with `job` itself and then with every fetched
///   snapshot, in fetch order, before the terminal check on that snapshot.
/// - `fetch` is called with the job id; it is expected to apply its own
///   transport-level retries. Each call counts as one attempt against
///   `max_attempts`.
/// - A transient fetch error (see [`Error::is_retryable`]) is tolerated: the
///   next delay becomes `backoff(consecutive_errors)` instead of the interval.
///   Any other error aborts the wait.
/// - `failed` yields [`Error::JobFailed`]; `succeeded` and `canceled` yield the
///   final snapshot. Unknown statuses are treated as still running.
///
/// Fetches are strictly sequential.
pub async fn wait_for<F, Fut, P>(
    job: Job,
    options: &WaitOptions,
    mut fetch: F,
    mut on_update: P,
) -> Result<Job>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Job>>,
    P: FnMut(&Job),
{
    let id = job.id.clone();
    let mut current = job;
    let mut attempts = 0u32;
    let mut errors = 0u32;

    on_update(&current);

    loop {
        if current.is_terminal() {
            return current.into_result();
        }
        if options.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(Error::Timeout { id, attempts });
        }

        let delay = if errors == 0 {
            options.interval()
        } else {
            (options.backoff)(errors)
        };
        tokio::time::sleep(delay).await;
        attempts += 1;

        match fetch(id.clone()).await {
            Ok(next) => {
                errors = 0;
                check_transition(&current.status, &next);
                on_update(&next);
                current = next;
            }
            Err(e) if e.is_retryable() => {
                errors += 1;
                tracing::warn!(
                    id = %id,
                    attempt = attempts,
                    consecutive_errors = errors,
                    error = %e,
                    "Transient error while polling"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

fn check_transition(previous: &JobStatus, next: &Job) {
    match (previous, &next.status) {
        (_, JobStatus::Unknown(status)) => {
            tracing::warn!(id = %next.id, status = %status, "Unrecognised job status, still polling");
        }
        (JobStatus::Unknown(_), _) => {}
        (previous, status) if !previous.can_transition_to(status) => {
            tracing::warn!(
                id = %next.id,
                from = %previous,
                to = %status,
                "Unexpected job status transition"
            );
        }
        _ => {}
    }
}
