//! Verification of inbound webhook deliveries.
//!
//! A delivery is signed as
//! `base64(HMAC-SHA256(key, "{webhook-id}.{webhook-timestamp}.{body}"))`, where
//! `key` is the base64-decoded part of the signing secret after its first
//! `_` (`whsec_<base64>`). The `webhook-signature` header carries one or more
//! space-separated `v1,<signature>` tokens; any match is accepted.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const WEBHOOK_ID_HEADER: &str = "webhook-id";
pub const WEBHOOK_TIMESTAMP_HEADER: &str = "webhook-timestamp";
pub const WEBHOOK_SIGNATURE_HEADER: &str = "webhook-signature";

const SIGNATURE_VERSION: &str = "v1";

/// The parts of an inbound delivery that take part in the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
    /// Raw body exactly as received.
    pub body: String,
}

impl WebhookRequest {
    pub fn new(
        id: impl Into<String>,
        timestamp: impl Into<String>,
        signature: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp: timestamp.into(),
            signature: signature.into(),
            body: body.into(),
        }
    }

    /// Collect the signature headers from an HTTP request.
    pub fn from_headers(headers: &HeaderMap, body: impl Into<String>) -> Result<Self> {
        let header = |name: &str| -> Result<String> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
                .ok_or_else(|| Error::Validation(format!("Missing webhook header '{}'", name)))
        };
        Ok(Self {
            id: header(WEBHOOK_ID_HEADER)?,
            timestamp: header(WEBHOOK_TIMESTAMP_HEADER)?,
            signature: header(WEBHOOK_SIGNATURE_HEADER)?,
            body: body.into(),
        })
    }
}

/// Check a delivery against `secret`.
///
/// Returns `Ok(false)` for a well-formed delivery whose signature does not
/// match. Empty id, timestamp or signature, or a secret that is not valid
/// base64 after its prefix, is an [`Error::Validation`].
pub fn validate_webhook(request: &WebhookRequest, secret: &str) -> Result<bool> {
    if request.id.is_empty() || request.timestamp.is_empty() {
        return Err(Error::Validation(
            "Webhook id and timestamp are required".to_string(),
        ));
    }
    if request.signature.trim().is_empty() {
        return Err(Error::Validation("Webhook signature is required".to_string()));
    }

    let mac = signed_content_mac(request, secret)?;
    let matched = request
        .signature
        .split_whitespace()
        .filter_map(|token| token.split_once(','))
        .filter(|(version, _)| *version == SIGNATURE_VERSION)
        .filter_map(|(_, signature)| BASE64_STANDARD.decode(signature).ok())
        .any(|signature| mac.clone().verify_slice(&signature).is_ok());

    if !matched {
        tracing::debug!(id = %request.id, "Webhook signature mismatch");
    }
    Ok(matched)
}

/// Compute the `v1` signature for a delivery.
///
/// Useful for tests and for relaying deliveries to other consumers.
pub fn sign(request: &WebhookRequest, secret: &str) -> Result<String> {
    let mac = signed_content_mac(request, secret)?;
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

fn signed_content_mac(request: &WebhookRequest, secret: &str) -> Result<HmacSha256> {
    let encoded = secret.split_once('_').map_or(secret, |(_, key)| key);
    let key = BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| Error::Validation(format!("Webhook secret is not valid base64: {}", e)))?;

    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| Error::Validation(format!("Invalid webhook secret: {}", e)))?;
    mac.update(request.id.as_bytes());
    mac.update(b".");
    mac.update(request.timestamp.as_bytes());
    mac.update(b".");
    mac.update(request.body.as_bytes());
    Ok(mac)
}
