//! The [`Client`]: one configured entry point that owns the transport and
//! exposes the request primitive every resource and helper is built on.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::identifier::ModelVersionIdentifier;
use crate::job::{Job, Page, Prediction, WebhookEventType};
use crate::pagination;
use crate::resources::{
    Account, Collections, Deployments, Files, HardwareList, Models, PredictionRequest, Predictions,
    Trainings,
};
use crate::retry::{RetryPolicy, with_retries};
use crate::stream::{self, JobEventStream};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::wait::{WaitMode, WaitOptions, wait_for};
use futures::stream::Stream;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Per-request knobs for [`Client::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// JSON body.
    pub body: Option<Value>,
    /// Extra headers, applied after the defaults (and therefore able to
    /// override them).
    pub headers: Vec<(String, String)>,
    /// Query parameters appended to the URL.
    pub query: Vec<(String, String)>,
    /// Override the idempotency derived from the HTTP method.
    pub idempotent: Option<bool>,
    /// Override the client's retry policy for this request.
    pub retry: Option<RetryPolicy>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(
            serde_json::to_value(body)
                .map_err(|e| Error::Validation(format!("Unserializable request body: {}", e)))?,
        );
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = Some(idempotent);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// Inputs for [`Client::run`] and [`Client::stream`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub input: Value,
    pub wait: WaitOptions,
    pub webhook: Option<String>,
    pub webhook_events_filter: Vec<WebhookEventType>,
    /// When fired, [`Client::run`] cancels the prediction and returns its
    /// (null) output; [`Client::stream`] closes the event stream.
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    pub fn new(input: Value) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    pub fn wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    pub fn webhook(mut self, url: impl Into<String>, events: Vec<WebhookEventType>) -> Self {
        self.webhook = Some(url.into());
        self.webhook_events_filter = events;
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn prediction_request(&self, version: Option<String>) -> PredictionRequest {
        let mut request = PredictionRequest::new(self.input.clone());
        request.version = version;
        if let Some(url) = &self.webhook {
            request = request.webhook(url.clone(), self.webhook_events_filter.clone());
        }
        request
    }
}

/// Async client for the prediction and training API.
///
/// Cheap to clone: clones share the configuration and the transport, so any
/// number of poll loops and event streams can run concurrently off one client.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    base_url: Url,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client that talks HTTP through `reqwest`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Build a client from `REPLICATE_API_TOKEN` / `REPLICATE_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Build a client on top of a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let base_url = config.parsed_base_url()?;
        Ok(Self {
            config: Arc::new(config),
            base_url,
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve a request target: absolute URLs are used verbatim, anything else
    /// is joined onto the base URL.
    pub fn resolve_url(&self, path_or_url: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(path_or_url) {
            return Ok(url);
        }
        self.base_url
            .join(path_or_url.trim_start_matches('/'))
            .map_err(|e| Error::Validation(format!("Invalid request path '{}': {}", path_or_url, e)))
    }

    fn build_request(
        &self,
        method: Method,
        path_or_url: &str,
        options: &RequestOptions,
    ) -> Result<HttpRequest> {
        let mut url = self.resolve_url(path_or_url)?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(options.query.iter());
        }

        let mut request = HttpRequest::new(method, url.as_str())
            .with_header(USER_AGENT.as_str(), &self.config.user_agent)?
            .with_header(ACCEPT.as_str(), "application/json")?;
        if let Some(token) = &self.config.auth {
            request = request.with_header(AUTHORIZATION.as_str(), &format!("Bearer {}", token))?;
        }
        if let Some(body) = &options.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| Error::Validation(format!("Unserializable request body: {}", e)))?;
            request = request
                .with_header(CONTENT_TYPE.as_str(), "application/json")?
                .with_body(bytes);
        }
        for (name, value) in &options.headers {
            request = request.with_header(name, value)?;
        }
        Ok(request)
    }

    /// Send one logical request.
    ///
    /// Relative paths are resolved against the base URL, authentication and
    /// user-agent headers are attached, transient failures are retried per the
    /// active [`RetryPolicy`], and any final non-2xx status is turned into
    /// [`Error::Api`].
    pub async fn request(
        &self,
        method: Method,
        path_or_url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse> {
        let request = self.build_request(method, path_or_url, &options)?;
        let idempotent = options.idempotent.unwrap_or_else(|| request.is_idempotent());
        let policy = options.retry.as_ref().unwrap_or(&self.config.retry);
        let method_label = request.method.to_string();

        tracing::debug!(method = %request.method, url = %request.url, "Sending request");
        let start = Instant::now();
        let result = with_retries(policy, idempotent, || self.transport.send(request.clone())).await;

        let status_label = match &result {
            Ok(response) => response.status().as_u16().to_string(),
            Err(_) => "transport_error".to_string(),
        };
        metrics::histogram!(
            "replicate_client.http.duration_seconds",
            "method" => method_label.clone()
        )
        .record(start.elapsed().as_secs_f64());
        metrics::counter!(
            "replicate_client.http.requests_total",
            "method" => method_label,
            "status" => status_label
        )
        .increment(1);

        check_http_status(result?).await
    }

    /// [`request`](Self::request) and decode the JSON response body.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path_or_url: &str,
        options: RequestOptions,
    ) -> Result<T> {
        self.request(method, path_or_url, options).await?.json().await
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path_or_url: &str) -> Result<T> {
        self.request_json(Method::GET, path_or_url, RequestOptions::default())
            .await
    }

    pub fn predictions(&self) -> Predictions<'_> {
        Predictions::new(self)
    }

    pub fn trainings(&self) -> Trainings<'_> {
        Trainings::new(self)
    }

    pub fn models(&self) -> Models<'_> {
        Models::new(self)
    }

    pub fn deployments(&self) -> Deployments<'_> {
        Deployments::new(self)
    }

    pub fn collections(&self) -> Collections<'_> {
        Collections::new(self)
    }

    pub fn hardware(&self) -> HardwareList<'_> {
        HardwareList::new(self)
    }

    pub fn account(&self) -> Account<'_> {
        Account::new(self)
    }

    pub fn files(&self) -> Files<'_> {
        Files::new(self)
    }

    /// Re-fetch a job: through its `urls.get` link when present, otherwise as a
    /// prediction by id.
    pub async fn reload(&self, job: &Job) -> Result<Job> {
        match &job.urls.get {
            Some(url) => self.get_json(url).await,
            None => self.predictions().get(&job.id).await,
        }
    }

    /// Poll `job` until it reaches a terminal status.
    ///
    /// `on_update` sees the given snapshot first and then every fetched one, in
    /// order. See [`wait_for`] for the exact policy.
    pub async fn wait<P>(&self, job: Job, options: &WaitOptions, on_update: P) -> Result<Job>
    where
        P: FnMut(&Job),
    {
        let get_url = job.urls.get.clone();
        wait_for(
            job,
            options,
            |id| {
                let target = get_url
                    .clone()
                    .unwrap_or_else(|| format!("predictions/{}", id));
                async move { self.get_json::<Job>(&target).await }
            },
            on_update,
        )
        .await
    }

    /// Create a prediction for `identifier` (`owner/name` or
    /// `owner/name:version`), wait for it, and return its output.
    ///
    /// A `failed` prediction yields [`Error::JobFailed`]. A prediction that is
    /// canceled, including through [`RunOptions::cancel`], yields its output,
    /// which is normally `null`.
    pub async fn run(&self, identifier: &str, options: RunOptions) -> Result<Value> {
        self.run_with_progress(identifier, options, |_| {}).await
    }

    /// [`run`](Self::run), reporting every snapshot to `on_update`.
    pub async fn run_with_progress<P>(
        &self,
        identifier: &str,
        options: RunOptions,
        on_update: P,
    ) -> Result<Value>
    where
        P: FnMut(&Job),
    {
        let job = self
            .create_for_identifier(identifier, &options, &options.wait.mode, false)
            .await?;
        tracing::debug!(id = %job.id, status = %job.status, "Prediction created");

        let finished = match &options.cancel {
            None => self.wait(job, &options.wait, on_update).await?,
            Some(token) => {
                let id = job.id.clone();
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::info!(id = %id, "Run canceled by caller");
                        self.predictions().cancel(&id).await?
                    }
                    result = self.wait(job, &options.wait, on_update) => result?,
                }
            }
        };

        tracing::info!(id = %finished.id, status = %finished.status, "Prediction finished");
        Ok(finished.into_result()?.output.unwrap_or(Value::Null))
    }

    /// Create a streaming prediction for `identifier` and return its live event
    /// feed.
    pub async fn stream(&self, identifier: &str, options: RunOptions) -> Result<JobEventStream> {
        // A blocking create would hold the response until the job is done.
        let job = self
            .create_for_identifier(identifier, &options, &WaitMode::Poll, true)
            .await?;
        let cancel = options.cancel.unwrap_or_default();
        self.stream_job(&job, cancel).await
    }

    /// Open the event feed of an existing job.
    pub async fn stream_job(&self, job: &Job, cancel: CancellationToken) -> Result<JobEventStream> {
        let url = job.urls.stream.as_deref().ok_or_else(|| {
            Error::Validation(format!("Job {} has no stream URL", job.id))
        })?;
        stream::open(self, url, cancel).await
    }

    /// Lazily walk every page of a listing, starting with `first`.
    pub fn paginate<'a, T, F, Fut>(
        &self,
        first: F,
    ) -> impl Stream<Item = Result<Vec<T>>> + 'a
    where
        T: DeserializeOwned + 'a,
        F: FnOnce() -> Fut + 'a,
        Fut: Future<Output = Result<Page<T>>> + 'a,
    {
        pagination::paginate(self.clone(), first)
    }

    async fn create_for_identifier(
        &self,
        identifier: &str,
        options: &RunOptions,
        mode: &WaitMode,
        stream: bool,
    ) -> Result<Prediction> {
        let identifier = ModelVersionIdentifier::parse(identifier)?;
        let request = options
            .prediction_request(identifier.version.clone())
            .stream(stream);
        match identifier.version {
            Some(_) => self.predictions().create_with(request, mode).await,
            None => {
                self.models()
                    .create_prediction(&identifier.owner, &identifier.name, request, mode)
                    .await
            }
        }
    }
}

/// Map a non-2xx response to [`Error::Api`], preferring the `detail` (or
/// `title`) field of a JSON problem body as the message.
pub(crate) async fn check_http_status(response: HttpResponse) -> Result<HttpResponse> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("title"))
                .and_then(|d| d.as_str())
                .map(str::to_owned)
        })
        .or_else(|| Some(body.trim().to_owned()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_owned());

    Err(Error::Api {
        status: status.as_u16(),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockTransport, job_value, mock_client};
    use crate::status::JobStatus;
    use serde_json::json;

    #[test]
    fn relative_paths_join_base_and_absolute_urls_pass_through() {
        let client = mock_client(MockTransport::new());
        assert_eq!(
            client.resolve_url("predictions").unwrap().as_str(),
            "http://mock.test/v1/predictions"
        );
        assert_eq!(
            client.resolve_url("/predictions/abc").unwrap().as_str(),
            "http://mock.test/v1/predictions/abc"
        );
        assert_eq!(
            client
                .resolve_url("https://elsewhere.test/v1/predictions?cursor=xyz")
                .unwrap()
                .as_str(),
            "https://elsewhere.test/v1/predictions?cursor=xyz"
        );
    }

    #[tokio::test]
    async fn attaches_auth_user_agent_and_json_headers() {
        let transport = MockTransport::new();
        transport.push_json(201, job_value("p1", "starting"));
        let client = mock_client(transport.clone());

        let options = RequestOptions::new()
            .json(&json!({"input": {"text": "hi"}}))
            .unwrap()
            .header("Prefer", "wait=5")
            .query("a", "b");
        client
            .request(Method::POST, "predictions", options)
            .await
            .unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.url, "http://mock.test/v1/predictions?a=b");
        assert_eq!(sent.headers["authorization"], "Bearer r8_mock");
        assert_eq!(sent.headers["content-type"], "application/json");
        assert_eq!(sent.headers["prefer"], "wait=5");
        assert!(sent.headers.contains_key("user-agent"));
        let body: Value = serde_json::from_slice(sent.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["input"]["text"], "hi");
    }

    #[tokio::test]
    async fn no_authorization_header_without_token() {
        let transport = MockTransport::new();
        transport.push_json(200, json!({}));
        let config = ClientConfig::default().base_url("http://mock.test/v1");
        let client = Client::with_transport(config, transport.clone()).unwrap();
        client
            .request(Method::GET, "account", RequestOptions::default())
            .await
            .unwrap();
        assert!(!transport.requests()[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn error_status_uses_detail_field() {
        let transport = MockTransport::new();
        transport.push_json(422, json!({"title": "Invalid", "detail": "input.text is required"}));
        let client = mock_client(transport);

        let err = client
            .request(Method::POST, "predictions", RequestOptions::default())
            .await
            .unwrap_err();
        match err {
            Error::Api { status, detail } => {
                assert_eq!(status, 422);
                assert_eq!(detail, "input.text is required");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_status_falls_back_to_raw_body_then_reason() {
        let transport = MockTransport::new();
        transport.push_bytes(404, "no such thing");
        transport.push_bytes(404, "");
        let client = mock_client(transport);

        let err = client.get_json::<Value>("x").await.unwrap_err();
        assert!(matches!(err, Error::Api { ref detail, .. } if detail == "no such thing"));
        let err = client.get_json::<Value>("x").await.unwrap_err();
        assert!(matches!(err, Error::Api { ref detail, .. } if detail == "Not Found"));
    }

    #[tokio::test]
    async fn get_retries_server_errors_through_the_client() {
        let transport = MockTransport::new();
        transport.push_bytes(500, "oops");
        transport.push_bytes(500, "oops");
        transport.push_json(200, job_value("p1", "processing"));
        let client = mock_client(transport.clone());

        let job = client.predictions().get("p1").await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn run_returns_output_of_succeeded_prediction() {
        let transport = MockTransport::new();
        transport.push_json(201, job_value("p1", "processing"));
        let mut done = job_value("p1", "succeeded");
        done["output"] = json!("foobar");
        transport.push_json(200, done);
        let client = mock_client(transport.clone());

        let options = RunOptions::new(json!({"text": "Alice"}))
            .wait(WaitOptions::default().interval_ms(1));
        let mut seen = Vec::new();
        let output = client
            .run_with_progress("owner/model:v1", options, |job| {
                seen.push(job.status.clone())
            })
            .await
            .unwrap();

        assert_eq!(output, json!("foobar"));
        assert_eq!(seen, vec![JobStatus::Processing, JobStatus::Succeeded]);

        let requests = transport.requests();
        assert_eq!(requests[0].url, "http://mock.test/v1/predictions");
        let body: Value = serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["version"], "v1");
        assert_eq!(requests[1].method, Method::GET);
        assert_eq!(requests[1].url, "http://mock.test/v1/predictions/p1");
    }

    #[tokio::test]
    async fn run_without_version_targets_model_endpoint() {
        let transport = MockTransport::new();
        let mut done = job_value("p2", "succeeded");
        done["output"] = json!(["a", "b"]);
        transport.push_json(201, done);
        let client = mock_client(transport.clone());

        let output = client
            .run("meta/llama", RunOptions::new(json!({})))
            .await
            .unwrap();
        assert_eq!(output, json!(["a", "b"]));
        assert_eq!(
            transport.requests()[0].url,
            "http://mock.test/v1/models/meta/llama/predictions"
        );
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn run_surfaces_job_failure() {
        let transport = MockTransport::new();
        let mut failed = job_value("p3", "failed");
        failed["error"] = json!("out of memory");
        transport.push_json(201, failed);
        let client = mock_client(transport);

        let err = client
            .run("owner/model:v1", RunOptions::new(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::JobFailed { ref id, .. } if id == "p3"));
    }

    #[tokio::test]
    async fn run_rejects_malformed_identifier_without_a_request() {
        let transport = MockTransport::new();
        let client = mock_client(transport.clone());
        let err = client
            .run("not-an-identifier", RunOptions::new(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_token_cancels_the_remote_prediction() {
        let transport = MockTransport::new();
        transport.push_json(201, job_value("p4", "processing"));
        transport.push_json(200, job_value("p4", "canceled"));
        let client = mock_client(transport.clone());

        let token = CancellationToken::new();
        token.cancel();
        let options = RunOptions::new(json!({}))
            .wait(WaitOptions::default().interval_ms(60_000))
            .cancel_token(token);
        let output = client.run("owner/model:v1", options).await.unwrap();

        assert_eq!(output, Value::Null);
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::POST);
        assert_eq!(requests[1].url, "http://mock.test/v1/predictions/p4/cancel");
    }

    #[tokio::test]
    async fn block_mode_sends_prefer_header_on_create() {
        let transport = MockTransport::new();
        let mut done = job_value("p5", "succeeded");
        done["output"] = json!(1);
        transport.push_json(201, done);
        let client = mock_client(transport.clone());

        let options = RunOptions::new(json!({})).wait(WaitOptions::block(Some(30)));
        client.run("owner/model:v1", options).await.unwrap();
        assert_eq!(transport.requests()[0].headers["prefer"], "wait=30");
    }

    #[tokio::test]
    async fn stream_job_requires_stream_url() {
        let client = mock_client(MockTransport::new());
        let job: Job = serde_json::from_value(job_value("p6", "starting")).unwrap();
        let err = client
            .stream_job(&job, CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn stream_creates_without_prefer_and_reads_events() {
        use futures::StreamExt;

        let transport = MockTransport::new();
        let mut created = job_value("p7", "starting");
        created["urls"]["stream"] = json!("http://mock.test/stream/p7");
        transport.push_json(201, created);
        transport.push_event_stream(vec![
            "event: output\ndata: he",
            "llo\n\nevent: done\ndata: {}\n\n",
        ]);
        let client = mock_client(transport.clone());

        let options = RunOptions::new(json!({})).wait(WaitOptions::block(Some(60)));
        let events: Vec<_> = client
            .stream("owner/model:v1", options)
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap().data, "hello");
        assert_eq!(events[1].as_ref().unwrap().event, "done");

        let requests = transport.requests();
        assert!(!requests[0].headers.contains_key("prefer"));
        let body: Value = serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(requests[1].url, "http://mock.test/stream/p7");
        assert_eq!(requests[1].headers["accept"], "text/event-stream");
    }

    #[tokio::test]
    async fn invalid_caller_header_fails_before_sending() {
        let transport = MockTransport::new();
        let client = mock_client(transport.clone());

        let options = RequestOptions::new().header("Prefer", "wait=5\r\nX-Injected: 1");
        let err = client
            .request(Method::GET, "account", options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn token_that_is_not_header_safe_is_rejected_at_construction() {
        let config = ClientConfig::new("r8_tok\n").base_url("http://mock.test/v1");
        let err = Client::with_transport(config, MockTransport::new()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn connection_failures_are_retried_then_surface_as_transport() {
        let transport = MockTransport::new();
        for _ in 0..4 {
            transport.push_error(Error::Transport("connection refused".to_string()));
        }
        let client = mock_client(transport.clone());

        let err = client.predictions().get("p8").await.unwrap_err();
        assert!(matches!(err, Error::Transport(ref m) if m == "connection refused"));
        assert_eq!(transport.request_count(), 4);
    }
}
