use crate::collection::{Collection, ContentDocument};
use crate::locale::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsSection {
    Site,
    Contact,
    Social,
}

const SITE_KEYS: &[&str] = &[
    "site_name",
    "tagline",
    "booking_url",
    "logo",
    "og_image",
    "footer_note",
];
const CONTACT_KEYS: &[&str] = &["email", "phone", "whatsapp", "address", "hours", "map_url"];
const SOCIAL_KEYS: &[&str] = &["instagram", "facebook", "tripadvisor", "youtube", "tiktok"];

impl SettingsSection {
    pub const ALL: [SettingsSection; 3] = [
        SettingsSection::Site,
        SettingsSection::Contact,
        SettingsSection::Social,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Contact => "contact",
            Self::Social => "social",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let needle = input.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == needle)
            .ok_or_else(|| ValidationError(format!("unknown settings section `{input}`")))
    }

    #[must_use]
    pub const fn allowed_keys(self) -> &'static [&'static str] {
        match self {
            Self::Site => SITE_KEYS,
            Self::Contact => CONTACT_KEYS,
            Self::Social => SOCIAL_KEYS,
        }
    }

    fn is_url_key(self, key: &str) -> bool {
        matches!(self, Self::Social) || key == "booking_url" || key == "map_url"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub section: SettingsSection,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    #[must_use]
    pub fn empty(section: SettingsSection) -> Self {
        Self {
            section,
            values: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Non-empty value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let allowed = self.section.allowed_keys();
        for (key, value) in &self.values {
            if !allowed.contains(&key.as_str()) {
                return Err(ValidationError(format!(
                    "unknown key `{key}` for settings section `{}`",
                    self.section.as_str()
                )));
            }
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if key == "email" && !value.contains('@') {
                return Err(ValidationError(format!("`{value}` is not an email address")));
            }
            if self.section.is_url_key(key)
                && !(value.starts_with("https://") || value.starts_with("http://"))
            {
                return Err(ValidationError(format!(
                    "`{key}` must be an http(s) URL"
                )));
            }
        }
        Ok(())
    }
}

impl ContentDocument for Settings {
    const COLLECTION: Collection = Collection::Settings;

    fn document_id(&self) -> String {
        self.section.as_str().to_string()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn validate_document(&self) -> Result<(), ValidationError> {
        self.validate()
    }
}
