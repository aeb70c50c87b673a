//! Error types for the Replicate client.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type covering configuration, caller input, transport,
/// protocol and job-level failures.
///
/// Variants are coarse-grained so that callers can match on error *category*
/// (retryable vs permanent, job failure vs transport failure) rather than on
/// endpoint-specific details.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing client configuration (no token, bad base URL, etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed caller input: bad webhook URL, unparseable model identifier,
    /// out-of-range wait duration, oversized inline file.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request never produced a response (DNS, connect, reset, etc.).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("API error ({status}): {detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Server-provided message (the `detail` field when present, otherwise
        /// the raw body or the canonical reason phrase).
        detail: String,
    },

    /// A response body could not be decoded into the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A prediction or training reached the terminal `failed` status.
    #[error("Job {id} failed: {error}")]
    JobFailed {
        /// Identifier of the failed job.
        id: String,
        /// The job's `error` payload as returned by the service.
        error: serde_json::Value,
    },

    /// The polling budget was exhausted before the job became terminal.
    #[error("Timed out waiting for job {id} after {attempts} polling attempts")]
    Timeout {
        /// Identifier of the job being polled.
        id: String,
        /// Number of polling iterations performed.
        attempts: u32,
    },

    /// The server reported an `error` event on a job's event stream.
    #[error("Stream error: {0}")]
    Stream(String),
}

impl Error {
    /// Returns `true` for transient errors that may succeed on retry:
    /// [`Transport`](Self::Transport) failures and [`Api`](Self::Api) errors
    /// with status 429 or 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }

    /// HTTP status carried by this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::Validation(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
