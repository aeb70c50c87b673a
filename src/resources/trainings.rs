//! `/trainings`.

use super::{create_job, segment, validate_webhook_url};
use crate::client::{Client, RequestOptions};
use crate::error::{Error, Result};
use crate::identifier::ModelVersionIdentifier;
use crate::job::{Page, Training, WebhookEventType};
use crate::wait::WaitMode;
use futures::stream::Stream;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a training creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    /// `owner/name` of the model the trained version is pushed to.
    pub destination: String,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub webhook_events_filter: Vec<WebhookEventType>,
}

impl TrainingRequest {
    pub fn new(destination: impl Into<String>, input: Value) -> Self {
        Self {
            destination: destination.into(),
            input,
            webhook: None,
            webhook_events_filter: Vec::new(),
        }
    }

    pub fn webhook(mut self, url: impl Into<String>, events: Vec<WebhookEventType>) -> Self {
        self.webhook = Some(url.into());
        self.webhook_events_filter = events;
        self
    }

    fn validate(&self) -> Result<()> {
        let destination = ModelVersionIdentifier::parse(&self.destination)?;
        if destination.version.is_some() {
            return Err(Error::Validation(format!(
                "Training destination '{}' must be owner/name without a version",
                self.destination
            )));
        }
        match &self.webhook {
            Some(url) => validate_webhook_url(url),
            None if !self.webhook_events_filter.is_empty() => Err(Error::Validation(
                "webhook_events_filter requires a webhook URL".to_string(),
            )),
            None => Ok(()),
        }
    }
}

/// Accessor returned by [`Client::trainings`].
#[derive(Debug, Clone, Copy)]
pub struct Trainings<'a> {
    client: &'a Client,
}

impl<'a> Trainings<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Start training `owner/name:version` into `request.destination`.
    pub async fn create(
        &self,
        owner: &str,
        name: &str,
        version: &str,
        request: TrainingRequest,
    ) -> Result<Training> {
        request.validate()?;
        let path = format!(
            "models/{}/{}/versions/{}/trainings",
            segment("Model owner", owner)?,
            segment("Model name", name)?,
            segment("Model version", version)?
        );
        create_job(self.client, &path, &request, &WaitMode::Poll).await
    }

    pub async fn get(&self, id: &str) -> Result<Training> {
        let id = segment("Training id", id)?;
        self.client.get_json(&format!("trainings/{}", id)).await
    }

    pub async fn cancel(&self, id: &str) -> Result<Training> {
        let id = segment("Training id", id)?;
        self.client
            .request_json(
                Method::POST,
                &format!("trainings/{}/cancel", id),
                RequestOptions::default(),
            )
            .await
    }

    pub async fn list(&self) -> Result<Page<Training>> {
        self.client.get_json("trainings").await
    }

    pub fn list_all(&self) -> impl Stream<Item = Result<Vec<Training>>> + 'a {
        let client = self.client;
        client.paginate(move || async move { client.get_json("trainings").await })
    }
}
