//! `/models` and their versions.

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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub owner: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `public` or `private`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<ModelVersion>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cog_version: Option<String>,
    /// OpenAPI schema describing the version's input and output.
    #[serde(default)]
    pub openapi_schema: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accessor returned by [`Client::models`].
#[derive(Debug, Clone, Copy)]
pub struct Models<'a> {
    client: &'a Client,
}

impl<'a> Models<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, owner: &str, name: &str) -> Result<Model> {
        self.client.get_json(&model_path(owner, name)?).await
    }

    pub async fn list(&self) -> Result<Page<Model>> {
        self.client.get_json("models").await
    }

    pub fn list_all(&self) -> impl Stream<Item = Result<Vec<Model>>> + 'a {
        let client = self.client;
        client.paginate(move || async move { client.get_json("models").await })
    }

    pub async fn versions(&self, owner: &str, name: &str) -> Result<Page<ModelVersion>> {
        let path = format!("{}/versions", model_path(owner, name)?);
        self.client.get_json(&path).await
    }

    pub async fn version(&self, owner: &str, name: &str, id: &str) -> Result<ModelVersion> {
        let path = format!(
            "{}/versions/{}",
            model_path(owner, name)?,
            segment("Model version", id)?
        );
        self.client.get_json(&path).await
    }

    /// Run the model's latest version. `request.version` must be unset.
    pub async fn create_prediction(
        &self,
        owner: &str,
        name: &str,
        request: PredictionRequest,
        mode: &WaitMode,
    ) -> Result<Prediction> {
        if request.version.is_some() {
            return Err(Error::Validation(
                "Model-scoped predictions run the latest version; use predictions().create_with to pin one"
                    .to_string(),
            ));
        }
        request.validate()?;
        let path = format!("{}/predictions", model_path(owner, name)?);
        create_job(self.client, &path, &request, mode).await
    }
}

fn model_path(owner: &str, name: &str) -> Result<String> {
    Ok(format!(
        "models/{}/{}",
        segment("Model owner", owner)?,
        segment("Model name", name)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockTransport, job_value, mock_client};
    use serde_json::json;

    #[tokio::test]
    async fn get_decodes_model_with_latest_version() {
        let transport = MockTransport::new();
        transport.push_json(
            200,
            json!({
                "owner": "replicate",
                "name": "hello-world",
                "visibility": "public",
                "run_count": 12345,
                "latest_version": {
                    "id": "5c7d5dc6",
                    "created_at": "2022-04-26T19:29:04.418669Z",
                    "cog_version": "0.3.0",
                    "openapi_schema": {"openapi": "3.0.2"}
                },
                "featured": true
            }),
        );
        let client = mock_client(transport.clone());

        let model = client.models().get("replicate", "hello-world").await.unwrap();
        assert_eq!(model.run_count, Some(12345));
        assert_eq!(model.latest_version.unwrap().id, "5c7d5dc6");
        assert_eq!(model.extra["featured"], true);
        assert_eq!(
            transport.requests()[0].url,
            "http://mock.test/v1/models/replicate/hello-world"
        );
    }

    #[tokio::test]
    async fn version_routes() {
        let transport = MockTransport::new();
        transport.push_json(200, json!({"results": [{"id": "v2"}, {"id": "v1"}]}));
        transport.push_json(200, json!({"id": "v1"}));
        let client = mock_client(transport.clone());

        let page = client.models().versions("acme", "m").await.unwrap();
        assert_eq!(page.results.len(), 2);
        assert!(page.next.is_none());
        let version = client.models().version("acme", "m", "v1").await.unwrap();
        assert_eq!(version.openapi_schema, Value::Null);

        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://mock.test/v1/models/acme/m/versions",
                "http://mock.test/v1/models/acme/m/versions/v1",
            ]
        );
    }

    #[tokio::test]
    async fn create_prediction_posts_to_model_route() {
        let transport = MockTransport::new();
        transport.push_json(201, job_value("p1", "starting"));
        let client = mock_client(transport.clone());

        client
            .models()
            .create_prediction(
                "meta",
                "llama",
                PredictionRequest::new(json!({"prompt": "hi"})),
                &WaitMode::Block { seconds: None },
            )
            .await
            .unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "http://mock.test/v1/models/meta/llama/predictions");
        assert_eq!(sent.headers["prefer"], "wait");
        let body: Value = serde_json::from_slice(sent.body.as_ref().unwrap()).unwrap();
        assert_eq!(body, json!({"input": {"prompt": "hi"}}));
    }

    #[tokio::test]
    async fn create_prediction_rejects_pinned_version() {
        let client = mock_client(MockTransport::new());
        let err = client
            .models()
            .create_prediction(
                "meta",
                "llama",
                PredictionRequest::new(json!({})).version("v1"),
                &WaitMode::Poll,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
