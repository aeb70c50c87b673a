//! Wire types shared by predictions and trainings, plus the generic page
//! envelope used by every list endpoint.

use crate::error::{Error, Result};
use crate::status::JobStatus;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A prediction or training tracked through its asynchronous lifecycle.
///
/// A `Job` is a snapshot: the client never mutates one locally, it replaces it
/// with a freshly fetched copy. Fields the service adds in the future are kept
/// in [`extra`](Self::extra).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Server-assigned identifier.
    pub id: String,
    pub status: JobStatus,
    /// `owner/name` of the model, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub input: Value,
    /// Populated once the job has succeeded (and, for streaming models,
    /// incrementally while it runs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Populated when the job has failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Log text; grows while the job runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    /// `api` or `web`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_removed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub urls: JobUrls,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Value>,
    /// Any field not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A prediction. Structurally identical to a [`Training`].
pub type Prediction = Job;

/// A training. Structurally identical to a [`Prediction`].
pub type Training = Job;

/// Resource links returned with every job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<String>,
    /// Server-Sent Events feed; present only when the job was created with
    /// streaming enabled and the model supports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<String>,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Convert a terminal `failed` snapshot into [`Error::JobFailed`]; any
    /// other snapshot is returned unchanged.
    pub fn into_result(self) -> Result<Self> {
        if self.status == JobStatus::Failed {
            return Err(Error::JobFailed {
                id: self.id,
                error: self.error.unwrap_or(Value::Null),
            });
        }
        Ok(self)
    }

    /// Deserialize the output into a concrete type.
    ///
    /// Returns `Ok(None)` while no output is available.
    pub fn output_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.output {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| Error::Decode(format!("job {} output: {}", self.id, e))),
        }
    }

    /// Wall-clock run time, once both `started_at` and `completed_at` are known.
    pub fn run_time(&self) -> Option<chrono::Duration> {
        Some(self.completed_at? - self.started_at?)
    }
}

/// Events a webhook can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// The job has started.
    Start,
    /// The job produced (partial) output.
    Output,
    /// The job wrote logs.
    Logs,
    /// The job reached a terminal state.
    Completed,
}

/// One page of a cursor-paginated list.
///
/// `next` present means more results can be fetched from that URL; absent
/// means the listing is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}
