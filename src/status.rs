//! Lifecycle of a prediction or training.
//!
//! ```text
//! starting ──► processing ──► succeeded
//!    │             │      ├─► failed
//!    │             │      └─► canceled
//!    └─────────────┴────────► canceled / failed / succeeded
//! ```
//!
//! Terminal states have no outgoing transitions. `canceled` can be reached
//! from any non-terminal state through an explicit cancel request.

use serde::{Deserialize, Serialize};

/// Status of a job as reported by the service.
///
/// Status strings the client does not know are preserved in
/// [`Unknown`](Self::Unknown) and treated as non-terminal, so a newer server
/// never breaks a poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    /// Created, waiting for a worker (initial state).
    Starting,
    /// A worker is running the model.
    Processing,
    /// Finished with output.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Stopped by a cancel request.
    Canceled,
    /// Any status string this client does not recognise.
    Unknown(String),
}

impl JobStatus {
    /// `true` for `succeeded`, `failed` and `canceled`, and only those.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Whether the service may move a job from `self` to `next`.
    ///
    /// Staying in the same non-terminal state is allowed (it is what most
    /// polls observe). Unknown statuses are never considered valid targets or
    /// sources.
    pub fn can_transition_to(&self, next: &JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Starting, Starting | Processing | Succeeded | Failed | Canceled) => true,
            (Processing, Processing | Succeeded | Failed | Canceled) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Unknown(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "starting" => Self::Starting,
            "processing" => Self::Processing,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            _ => Self::Unknown(value),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Unknown(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_known() -> Vec<JobStatus> {
        vec![
            JobStatus::Starting,
            JobStatus::Processing,
            JobStatus::Succeeded,
            JobStatus::Failed,
            JobStatus::Canceled,
        ]
    }

    #[test]
    fn terminal_exactly_for_finished_states() {
        for status in all_known() {
            let expected = matches!(status.as_str(), "succeeded" | "failed" | "canceled");
            assert_eq!(status.is_terminal(), expected, "{status}");
        }
        assert!(!JobStatus::Unknown("queued".into()).is_terminal());
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for from in all_known().into_iter().filter(JobStatus::is_terminal) {
            for to in all_known() {
                assert!(!from.can_transition_to(&to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn cancel_is_reachable_from_every_live_state() {
        assert!(JobStatus::Starting.can_transition_to(&JobStatus::Canceled));
        assert!(JobStatus::Processing.can_transition_to(&JobStatus::Canceled));
    }

    #[test]
    fn processing_never_goes_back_to_starting() {
        assert!(!JobStatus::Processing.can_transition_to(&JobStatus::Starting));
    }

    #[test]
    fn round_trips_through_json() {
        let status: JobStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(status, JobStatus::Processing);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"processing\"");
    }

    #[test]
    fn unknown_status_is_preserved_verbatim() {
        let status: JobStatus = serde_json::from_str("\"aborted\"").unwrap();
        assert_eq!(status, JobStatus::Unknown("aborted".into()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"aborted\"");
    }
}
