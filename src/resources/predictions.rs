//! `/predictions`.

use super::{create_job, segment, validate_webhook_url};
use crate::client::{Client, RequestOptions};
use crate::error::{Error, Result};
use crate::job::{Page, Prediction, WebhookEventType};
use crate::wait::WaitMode;
use futures::stream::Stream;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a prediction creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Required on `POST /predictions`; omitted for model and deployment
    /// scoped creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub webhook_events_filter: Vec<WebhookEventType>,
    /// Ask for a `urls.stream` feed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl PredictionRequest {
    pub fn new(input: Value) -> Self {
        Self {
            version: None,
            input,
            webhook: None,
            webhook_events_filter: Vec::new(),
            stream: false,
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Deliver lifecycle events to `url`. An empty `events` list means the
    /// server default.
    pub fn webhook(mut self, url: impl Into<String>, events: Vec<WebhookEventType>) -> Self {
        self.webhook = Some(url.into());
        self.webhook_events_filter = events;
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match &self.webhook {
            Some(url) => validate_webhook_url(url),
            None if !self.webhook_events_filter.is_empty() => Err(Error::Validation(
                "webhook_events_filter requires a webhook URL".to_string(),
            )),
            None => Ok(()),
        }
    }
}

/// Accessor returned by [`Client::predictions`].
#[derive(Debug, Clone, Copy)]
pub struct Predictions<'a> {
    client: &'a Client,
}

impl<'a> Predictions<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Create a prediction of a specific model version.
    pub async fn create(&self, version: &str, input: Value) -> Result<Prediction> {
        self.create_with(PredictionRequest::new(input).version(version), &WaitMode::Poll)
            .await
    }

    /// Create a prediction from a full request, optionally blocking server-side.
    pub async fn create_with(
        &self,
        request: PredictionRequest,
        mode: &WaitMode,
    ) -> Result<Prediction> {
        match request.version.as_deref() {
            Some(v) if !v.is_empty() => {}
            _ => {
                return Err(Error::Validation(
                    "A version is required to create a prediction".to_string(),
                ));
            }
        }
        request.validate()?;
        create_job(self.client, "predictions", &request, mode).await
    }

    pub async fn get(&self, id: &str) -> Result<Prediction> {
        let id = segment("Prediction id", id)?;
        self.client.get_json(&format!("predictions/{}", id)).await
    }

    /// Request cancellation and return the updated prediction.
    pub async fn cancel(&self, id: &str) -> Result<Prediction> {
        let id = segment("Prediction id", id)?;
        self.client
            .request_json(
                Method::POST,
                &format!("predictions/{}/cancel", id),
                RequestOptions::default(),
            )
            .await
    }

    /// First page of predictions, newest first.
    pub async fn list(&self) -> Result<Page<Prediction>> {
        self.client.get_json("predictions").await
    }

    /// Every prediction, one page at a time.
    pub fn list_all(&self) -> impl Stream<Item = Result<Vec<Prediction>>> + 'a {
        let client = self.client;
        client.paginate(move || async move { client.get_json("predictions").await })
    }
}
