//! `/collections`.

use super::models::Model;
use super::segment;
use crate::client::Client;
use crate::error::Result;
use crate::job::Page;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};

/// A curated group of models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Only present when a single collection is fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<Model>>,
}

/// Accessor returned by [`Client::collections`].
#[derive(Debug, Clone, Copy)]
pub struct Collections<'a> {
    client: &'a Client,
}

impl<'a> Collections<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, slug: &str) -> Result<Collection> {
        let slug = segment("Collection slug", slug)?;
        self.client.get_json(&format!("collections/{}", slug)).await
    }

    pub async fn list(&self) -> Result<Page<Collection>> {
        self.client.get_json("collections").await
    }

    pub fn list_all(&self) -> impl Stream<Item = Result<Vec<Collection>>> + 'a {
        let client = self.client;
        client.paginate(move || async move { client.get_json("collections").await })
    }
}
