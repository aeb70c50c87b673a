#![allow(dead_code)]

//! Mock transport for unit tests.
//!
//! [`MockTransport`] answers requests from a script of canned replies, in
//! order, and records every request it receives. All types are gated with
//! `#[cfg(test)]`.

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::job::Job;
use crate::retry::RetryPolicy;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const MOCK_BASE_URL: &str = "http://mock.test/v1";

/// Scripted [`Transport`].
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_response(&self, response: HttpResponse) {
        self.replies.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_response(
            HttpResponse::from_bytes(status, body.to_string())
                .with_header("content-type", "application/json")
                .unwrap(),
        );
    }

    pub fn push_bytes(&self, status: u16, body: &str) {
        self.push_response(HttpResponse::from_bytes(status, body.to_owned()));
    }

    /// A 200 `text/event-stream` response delivered in the given chunks.
    pub fn push_event_stream(&self, chunks: Vec<&'static str>) {
        let chunks = chunks
            .into_iter()
            .map(|c| Bytes::from_static(c.as_bytes()))
            .collect();
        self.push_response(
            HttpResponse::from_chunks(200, chunks)
                .with_header("content-type", "text/event-stream")
                .unwrap(),
        );
    }

    pub fn push_error(&self, error: Error) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport(format!("no scripted reply for {}", url))))
    }
}

/// A client on [`MOCK_BASE_URL`] with a near-instant retry policy.
pub fn mock_client(transport: Arc<MockTransport>) -> Client {
    let config = ClientConfig::new("r8_mock")
        .base_url(MOCK_BASE_URL)
        .retry(RetryPolicy {
            max_retries: 3,
            base_interval_ms: 1,
            jitter_ms: 0,
        });
    Client::with_transport(config, transport).unwrap()
}

/// Wire representation of a job without a `get` link, so reloads go through
/// `predictions/{id}`.
pub fn job_value(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "model": "owner/model",
        "version": "v1",
        "input": {},
        "created_at": "2024-01-01T00:00:00Z",
        "urls": {
            "cancel": format!("{}/predictions/{}/cancel", MOCK_BASE_URL, id),
        },
    })
}

pub fn job(id: &str, status: &str) -> Job {
    serde_json::from_value(job_value(id, status)).unwrap()
}
