//! `/account`.

use crate::client::Client;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// The account the API token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// `user` or `organization`.
    #[serde(rename = "type")]
    pub kind: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
}

/// Accessor returned by [`Client::account`].
#[derive(Debug, Clone, Copy)]
pub struct Account<'a> {
    client: &'a Client,
}

impl<'a> Account<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<AccountInfo> {
        self.client.get_json("account").await
    }
}
