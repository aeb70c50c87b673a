//! `/files`. Listing, lookup and deletion only; inputs are passed inline (see
//! [`encode_data_uri`](crate::file::encode_data_uri)).

use super::segment;
use crate::client::{Client, RequestOptions};
use crate::error::Result;
use crate::job::Page;
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksums: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Links, including `get` for downloading the content.
    #[serde(default)]
    pub urls: Map<String, Value>,
}

/// Accessor returned by [`Client::files`].
#[derive(Debug, Clone, Copy)]
pub struct Files<'a> {
    client: &'a Client,
}

impl<'a> Files<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &str) -> Result<FileObject> {
        let id = segment("File id", id)?;
        self.client.get_json(&format!("files/{}", id)).await
    }

    pub async fn list(&self) -> Result<Page<FileObject>> {
        self.client.get_json("files").await
    }

    pub fn list_all(&self) -> impl Stream<Item = Result<Vec<FileObject>>> + 'a {
        let client = self.client;
        client.paginate(move || async move { client.get_json("files").await })
    }

    /// Delete a file. The service answers `204 No Content`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = segment("File id", id)?;
        self.client
            .request(
                Method::DELETE,
                &format!("files/{}", id),
                RequestOptions::default(),
            )
            .await?;
        tracing::debug!(id = %id, "File deleted");
        Ok(())
    }
}
