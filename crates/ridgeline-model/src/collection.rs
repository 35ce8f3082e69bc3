use crate::locale::ValidationError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Activities,
    Pages,
    Settings,
    Inquiries,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Activities,
        Collection::Pages,
        Collection::Settings,
        Collection::Inquiries,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activities => "activities",
            Self::Pages => "pages",
            Self::Settings => "settings",
            Self::Inquiries => "inquiries",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let needle = input.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| ValidationError(format!("unknown collection `{input}`")))
    }

    /// Parse a comma-separated list; empty input means every collection.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, ValidationError> {
        let parts: Vec<&str> = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            return Ok(Self::ALL.to_vec());
        }
        parts.into_iter().map(Self::parse).collect()
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed document that lives in exactly one collection.
pub trait ContentDocument: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn document_id(&self) -> String;

    fn updated_at(&self) -> DateTime<Utc>;

    fn validate_document(&self) -> Result<(), ValidationError>;
}
