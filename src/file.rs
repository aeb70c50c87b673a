//! Inline file inputs.
//!
//! Small files can be passed to a model directly inside the input JSON as a
//! `data:` URI instead of being uploaded first.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

/// Largest payload accepted by [`encode_data_uri`].
pub const MAX_DATA_URI_BYTES: usize = 10 * 1024 * 1024;

/// Fallback media type when none is known.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Encode `bytes` as `data:<mime>;base64,<payload>`.
///
/// An empty `mime` falls back to [`DEFAULT_MIME_TYPE`]. Payloads over
/// [`MAX_DATA_URI_BYTES`] are rejected with [`Error::Validation`].
pub fn encode_data_uri(bytes: &[u8], mime: &str) -> Result<String> {
    if bytes.len() > MAX_DATA_URI_BYTES {
        return Err(Error::Validation(format!(
            "File of {} bytes exceeds the {} byte limit for inline inputs",
            bytes.len(),
            MAX_DATA_URI_BYTES
        )));
    }
    let mime = match mime.trim() {
        "" => DEFAULT_MIME_TYPE,
        m => m,
    };
    Ok(format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(bytes)))
}
