//! Async Rust client for the Replicate machine-learning inference API.
//!
//! The API runs models as asynchronous *jobs* (predictions and trainings): a
//! request creates the job, and the result arrives later. This crate turns
//! that into single awaitable calls with retries, backoff, cancellation and
//! live streaming.
//!
//! # Key concepts
//!
//! - **[`Client`](client::Client)**: the configured entry point. Owns a
//!   pluggable [`Transport`](transport::Transport) and exposes
//!   [`request`](client::Client::request), the primitive every resource
//!   accessor is built on.
//! - **[`Job`](job::Job)**: a prediction or training snapshot, moving through
//!   the [`JobStatus`](status::JobStatus) state machine.
//! - **Retries**: every HTTP call is wrapped by
//!   [`with_retries`](retry::with_retries) (429 always, 5xx for idempotent
//!   requests, `Retry-After` honoured).
//! - **Polling**: [`wait_for`](wait::wait_for) re-fetches a job until it is
//!   terminal, with a poll budget and error backoff.
//! - **Streaming**: [`SseParser`](sse::SseParser) incrementally parses
//!   `text/event-stream` bodies, surfaced as a
//!   [`JobEventStream`](stream::JobEventStream).
//!
//! # Quick start
//!
//! ```rust,no_run
//! use replicate_client::client::{Client, RunOptions};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::from_env()?;
//! let output = client
//!     .run(
//!         "stability-ai/sdxl:39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b",
//!         RunOptions::new(json!({"prompt": "an astronaut riding a horse"})),
//!     )
//!     .await?;
//! println!("{output}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod file;
pub mod identifier;
pub mod job;
mod pagination;
pub mod resources;
pub mod retry;
pub mod sse;
pub mod status;
pub mod stream;
pub mod transport;
pub mod wait;
pub mod webhook;

pub use client::{Client, RequestOptions, RunOptions};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use job::{Job, Page, Prediction, Training, WebhookEventType};
pub use status::JobStatus;

#[cfg(test)]
mod mock;
