//! `/hardware`.

use crate::client::Client;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A hardware class a model or deployment can run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hardware {
    /// Human-readable name, e.g. `Nvidia T4 GPU`.
    pub name: String,
    /// Identifier used in API requests, e.g. `gpu-t4`.
    pub sku: String,
}

/// Accessor returned by [`Client::hardware`].
#[derive(Debug, Clone, Copy)]
pub struct HardwareList<'a> {
    client: &'a Client,
}

impl<'a> HardwareList<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// All available hardware. Not paginated.
    pub async fn list(&self) -> Result<Vec<Hardware>> {
        self.client.get_json("hardware").await
    }
}
