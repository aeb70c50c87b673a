//! `owner/name[:version]` model references.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A model, optionally pinned to one version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelVersionIdentifier {
    pub owner: String,
    pub name: String,
    pub version: Option<String>,
}

impl ModelVersionIdentifier {
    /// Parse `owner/name` or `owner/name:version`.
    ///
    /// Owner and name must be non-empty and contain only ASCII alphanumerics,
    /// `-`, `_` and `.`; a version, when the colon is present, must be a
    /// non-empty alphanumeric string.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || {
            Error::Validation(format!(
                "Invalid model identifier '{}': expected owner/name or owner/name:version",
                s
            ))
        };

        let (model, version) = match s.split_once(':') {
            Some((model, version)) => (model, Some(version)),
            None => (s, None),
        };
        let (owner, name) = model.split_once('/').ok_or_else(invalid)?;

        if !is_segment(owner) || !is_segment(name) {
            return Err(invalid());
        }
        if let Some(version) = version {
            if version.is_empty() || !version.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(invalid());
            }
        }

        Ok(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
            version: version.map(str::to_owned),
        })
    }
}

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl FromStr for ModelVersionIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelVersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{}", version)?;
        }
        Ok(())
    }
}
