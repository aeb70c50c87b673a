//! Client configuration: credentials, endpoint, user agent and retry policy.
//!
//! Values are resolved in this order (highest first):
//!
//! 1. Explicit builder calls ([`ClientConfig::new`], [`ClientConfig::base_url`], ...).
//! 2. The `REPLICATE_API_TOKEN` / `REPLICATE_BASE_URL` environment variables
//!    (via [`ClientConfig::from_env`]).
//! 3. Built-in defaults.

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable holding the API token.
pub const API_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";

/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "REPLICATE_BASE_URL";

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";

/// `User-Agent` sent when none is configured.
pub fn default_user_agent() -> String {
    format!("replicate-client-rust/{}", env!("CARGO_PKG_VERSION"))
}

/// Everything needed to construct a [`Client`](crate::client::Client).
///
/// Can be built programmatically or parsed from JSON; the token is never
/// serialized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Bearer token. Requests are sent without `Authorization` when unset.
    #[serde(skip_serializing)]
    pub auth: Option<String>,
    /// Base URL that relative request paths are resolved against.
    pub base_url: String,
    pub user_agent: String,
    /// Retry policy applied to every request.
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: default_user_agent(),
            retry: RetryPolicy::default(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ClientConfig {
    /// Config with the given token and defaults for everything else.
    pub fn new(auth: impl Into<String>) -> Self {
        Self {
            auth: Some(auth.into()),
            ..Self::default()
        }
    }

    /// Resolve token and base URL from the environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.auth = std::env::var(API_TOKEN_ENV).ok().filter(|t| !t.is_empty());
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.is_empty() {
                config.base_url = base_url;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from JSON and validate it.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)
            .map_err(|e| Error::Config(format!("Invalid client config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validate invariants: the base URL must be an absolute `http(s)` URL, the
    /// user agent must be non-empty, and a configured token must be non-empty.
    /// Both must be usable as HTTP header values.
    pub fn validate(&self) -> Result<()> {
        self.parsed_base_url()?;
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("User agent cannot be empty".to_string()));
        }
        if HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(Error::Config(
                "User agent contains characters not allowed in an HTTP header".to_string(),
            ));
        }
        if let Some(token) = &self.auth {
            if token.is_empty() {
                return Err(Error::Config("API token cannot be empty".to_string()));
            }
            // Message omits the token itself.
            if HeaderValue::from_str(&format!("Bearer {}", token)).is_err() {
                return Err(Error::Config(
                    "API token contains characters not allowed in an HTTP header".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// The base URL with a trailing slash, ready for [`Url::join`].
    pub(crate) fn parsed_base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Base URL '{}' must use http or https",
                self.base_url
            )));
        }
        Ok(url)
    }
}
