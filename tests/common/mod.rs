#![allow(dead_code)]

//! Shared helpers for the integration tests: a client pointed at a wiremock
//! server and canned job payloads.

use replicate_client::client::Client;
use replicate_client::config::ClientConfig;
use replicate_client::retry::RetryPolicy;
use serde_json::{Value, json};
use wiremock::MockServer;

pub const TOKEN: &str = "r8_integration";

/// Retries quickly so that failure paths stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_interval_ms: 5,
        jitter_ms: 0,
    }
}

pub fn base_url(server: &MockServer) -> String {
    format!("{}/v1", server.uri())
}

pub fn client_for(server: &MockServer) -> Client {
    let config = ClientConfig::new(TOKEN)
        .base_url(base_url(server))
        .retry(fast_retry());
    Client::new(config).unwrap()
}

/// A job payload whose links point back at `server`.
pub fn job_json(server: &MockServer, id: &str, status: &str) -> Value {
    let base = base_url(server);
    json!({
        "id": id,
        "status": status,
        "model": "acme/echo",
        "version": "v1",
        "input": {"text": "hello"},
        "logs": "",
        "created_at": "2024-05-01T10:00:00Z",
        "urls": {
            "get": format!("{}/predictions/{}", base, id),
            "cancel": format!("{}/predictions/{}/cancel", base, id),
            "stream": format!("{}/stream/{}", server.uri(), id),
        },
    })
}

pub fn succeeded_json(server: &MockServer, id: &str, output: Value) -> Value {
    let mut job = job_json(server, id, "succeeded");
    job["output"] = output;
    job["completed_at"] = json!("2024-05-01T10:00:05Z");
    job
}
