//! Pluggable HTTP transport.
//!
//! Everything the client sends goes through a single [`Transport::send`]
//! primitive: one request in, one response (status, headers, lazily-read body)
//! out. The default implementation is backed by `reqwest`; tests and callers
//! with special networking needs can inject their own.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::pin::Pin;

/// A response body delivered chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A fully-resolved outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Set a header. Names or values that are not valid HTTP tokens are an
    /// [`Error::Validation`].
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether repeating this request has no additional side effects.
    pub fn is_idempotent(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }
}

/// An HTTP response whose body has not been read yet.
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ByteStream,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: ByteStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Build a response with a fully buffered body. Unknown status codes map to
    /// 500.
    pub fn from_bytes(status: u16, body: impl Into<Bytes>) -> Self {
        Self::from_chunks(status, vec![body.into()])
    }

    /// Build a response whose body is delivered as the given sequence of chunks.
    pub fn from_chunks(status: u16, chunks: Vec<Bytes>) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = futures::stream::iter(chunks.into_iter().map(Ok::<_, Error>));
        Self::new(status, HeaderMap::new(), Box::pin(body))
    }

    /// Set a response header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Look up a header as UTF-8 text.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Read the entire body into memory.
    pub async fn bytes(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Read the entire body as UTF-8 text (invalid sequences are replaced).
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read the entire body and deserialize it as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Hand over the raw body stream without buffering it.
    pub fn into_stream(self) -> ByteStream {
        self.body
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::Validation(format!("Invalid header name '{}'", name)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|_| Error::Validation(format!("Invalid value for header '{}'", name)))?;
    Ok((header_name, header_value))
}

/// The single network primitive the client is built on.
///
/// Implementations must be cheap to share: one transport instance serves every
/// request, poll loop and event stream of a [`Client`](crate::client::Client).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response head with a lazily-read body.
    ///
    /// Connection-level failures must be reported as
    /// [`Error::Transport`]; non-2xx statuses are *not* errors at this layer.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Default [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing, pre-configured `reqwest::Client` (proxies, timeouts,
    /// custom TLS roots, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(Error::from));
        Ok(HttpResponse::new(status, headers, Box::pin(body)))
    }
}
