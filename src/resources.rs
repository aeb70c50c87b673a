//! Route builders for the API's resources.
//!
//! Each accessor borrows the [`Client`](crate::client::Client) and maps its
//! arguments onto a single `Client::request` call. None of them hold state.
//!
//! | Module | Accessor | Routes |
//! |--------|----------|--------|
//! | `predictions` | [`Predictions`] | `/predictions`, `/predictions/{id}`, `/predictions/{id}/cancel` |
//! | `trainings` | [`Trainings`] | `/models/{owner}/{name}/versions/{version}/trainings`, `/trainings/{id}`, `/trainings/{id}/cancel` |
//! | `models` | [`Models`] | `/models`, `/models/{owner}/{name}`, `.../versions`, `.../predictions` |
//! | `deployments` | [`Deployments`] | `/deployments`, `/deployments/{owner}/{name}`, `.../predictions` |
//! | `collections` | [`Collections`] | `/collections`, `/collections/{slug}` |
//! | `hardware` | [`HardwareList`] | `/hardware` |
//! | `account` | [`Account`] | `/account` |
//! | `files` | [`Files`] | `/files`, `/files/{id}` |

pub mod account;
pub mod collections;
pub mod deployments;
pub mod files;
pub mod hardware;
pub mod models;
pub mod predictions;
pub mod trainings;

// Re-exports (same order as module declarations above).
pub use account::{Account, AccountInfo};
pub use collections::{Collection, Collections};
pub use deployments::{Deployment, DeploymentRelease, Deployments};
pub use files::{FileObject, Files};
pub use hardware::{Hardware, HardwareList};
pub use models::{Model, ModelVersion, Models};
pub use predictions::{PredictionRequest, Predictions};
pub use trainings::{TrainingRequest, Trainings};

use crate::client::{Client, RequestOptions};
use crate::error::{Error, Result};
use crate::job::Job;
use crate::wait::WaitMode;
use reqwest::Method;
use serde::Serialize;
use url::Url;

/// Check that `value` can be used as a single path segment.
pub(crate) fn segment<'s>(what: &str, value: &'s str) -> Result<&'s str> {
    if value.is_empty() {
        return Err(Error::Validation(format!("{} cannot be empty", what)));
    }
    if value
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
    {
        return Err(Error::Validation(format!(
            "{} '{}' contains characters not allowed in a path segment",
            what, value
        )));
    }
    Ok(value)
}

/// Webhook targets must be absolute `https` URLs.
pub(crate) fn validate_webhook_url(webhook: &str) -> Result<()> {
    let url = Url::parse(webhook)
        .map_err(|e| Error::Validation(format!("Invalid webhook URL '{}': {}", webhook, e)))?;
    if url.scheme() != "https" {
        return Err(Error::Validation(format!(
            "Webhook URL '{}' must use https",
            webhook
        )));
    }
    Ok(())
}

/// POST a job creation body, adding `Prefer: wait[=N]` for blocking mode.
pub(crate) async fn create_job<B: Serialize>(
    client: &Client,
    path: &str,
    body: &B,
    mode: &WaitMode,
) -> Result<Job> {
    let mut options = RequestOptions::new();
    if let Some(prefer) = mode.prefer_header()? {
        options = options.header("Prefer", prefer);
    }
    let options = options.json(body)?;
    let job: Job = client.request_json(Method::POST, path, options).await?;
    tracing::debug!(id = %job.id, status = %job.status, path = %path, "Job created");
    Ok(job)
}
