//! `/deployments`.

use super::predictions::PredictionRequest;
use super::{create_job, segment};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::job::{Page, Prediction};
use crate::wait::WaitMode;
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named, configured endpoint serving one model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub owner: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_release: Option<DeploymentRelease>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRelease {
    pub number: u64,
    /// `owner/name` of the served model.
    pub model: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Value>,
    /// Hardware and scaling settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
}

/// Accessor returned by [`Client::deployments`].
#[derive(Debug, Clone, Copy)]
pub struct Deployments<'a> {
    client: &'a Client,
}

impl<'a> Deployments<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, owner: &str, name: &str) -> Result<Deployment> {
        self.client.get_json(&deployment_path(owner, name)?).await
    }

    pub async fn list(&self) -> Result<Page<Deployment>> {
        self.client.get_json("deployments").await
    }

    pub fn list_all(&self) -> impl Stream<Item = Result<Vec<Deployment>>> + 'a {
        let client = self.client;
        client.paginate(move || async move { client.get_json("deployments").await })
    }

    /// Run the deployment's current release.
    pub async fn create_prediction(
        &self,
        owner: &str,
        name: &str,
        request: PredictionRequest,
        mode: &WaitMode,
    ) -> Result<Prediction> {
        if request.version.is_some() {
            return Err(Error::Validation(
                "Deployment predictions use the deployment's current release; version must be unset"
                    .to_string(),
            ));
        }
        request.validate()?;
        let path = format!("{}/predictions", deployment_path(owner, name)?);
        create_job(self.client, &path, &request, mode).await
    }
}

fn deployment_path(owner: &str, name: &str) -> Result<String> {
    Ok(format!(
        "deployments/{}/{}",
        segment("Deployment owner", owner)?,
        segment("Deployment name", name)?
    ))
}
