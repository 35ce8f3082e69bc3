// SPDX-License-Identifier: Apache-2.0

use crate::errors::ApiError;
use chrono::{DateTime, Utc};
use ridgeline_model::{
    Activity, ActivityTranslation, Difficulty, Inquiry, Locale, Page, PageKind, Price, Settings,
    SettingsSection, Slug,
};
use ridgeline_store::{SyncReport, WriteOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Admin body for creating or replacing an activity. A record fetched from
/// the API is accepted as is; its server-set fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityUpsert {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category: String,
    pub difficulty: Difficulty,
    pub duration_minutes: u32,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub min_age: Option<u8>,
    #[serde(default)]
    pub max_group_size: Option<u16>,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub sort_order: i32,
    pub translations: BTreeMap<Locale, ActivityTranslation>,
    /// Read-only, stamped on save.
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ActivityUpsert {
    /// Slug resolution: path slug, then body slug, then the title of the
    /// `default_locale` translation (or the first one).
    pub fn into_activity(
        self,
        path_slug: Option<&Slug>,
        default_locale: &Locale,
        now: DateTime<Utc>,
    ) -> Result<Activity, ApiError> {
        let slug = match (path_slug, self.slug.as_deref()) {
            (Some(path), Some(body)) if body != path.as_str() => {
                return Err(ApiError::validation_failed(
                    "slug",
                    format!("body slug `{body}` does not match path slug `{path}`"),
                ))
            }
            (Some(path), _) => path.clone(),
            (None, Some(body)) => Slug::parse(body)?,
            (None, None) => {
                let title = self
                    .translations
                    .get(default_locale)
                    .or_else(|| self.translations.values().next())
                    .map(|t| t.title.as_str())
                    .unwrap_or_default();
                Slug::from_title(title)?
            }
        };
        let activity = Activity {
            slug,
            category: self.category.trim().to_string(),
            difficulty: self.difficulty,
            duration_minutes: self.duration_minutes,
            price: self.price,
            min_age: self.min_age,
            max_group_size: self.max_group_size,
            cover_image: self.cover_image.trim().to_string(),
            gallery: self
                .gallery
                .into_iter()
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect(),
            featured: self.featured,
            published: self.published,
            sort_order: self.sort_order,
            translations: self.translations,
            updated_at: now,
        };
        activity.validate()?;
        Ok(activity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageUpsert {
    /// Read-only: kind and locale come from the route.
    #[serde(default, skip_serializing)]
    pub kind: Option<PageKind>,
    #[serde(default, skip_serializing)]
    pub locale: Option<Locale>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub hero_image: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub meta_description: String,
}

impl PageUpsert {
    pub fn into_page(
        self,
        kind: PageKind,
        locale: Locale,
        now: DateTime<Utc>,
    ) -> Result<Page, ApiError> {
        let page = Page {
            kind,
            locale,
            title: self.title.trim().to_string(),
            subtitle: self.subtitle.trim().to_string(),
            hero_image: self.hero_image.trim().to_string(),
            body: self.body,
            meta_description: self.meta_description.trim().to_string(),
            updated_at: now,
        };
        page.validate()?;
        Ok(page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsUpdate {
    pub values: BTreeMap<String, String>,
}

impl SettingsUpdate {
    /// Collect the allowed keys of `section` from submitted form fields;
    /// anything else in the form is ignored.
    #[must_use]
    pub fn from_form(section: SettingsSection, form: &BTreeMap<String, String>) -> Self {
        let values = section
            .allowed_keys()
            .iter()
            .filter_map(|key| form.get(*key).map(|v| ((*key).to_string(), v.trim().to_string())))
            .collect();
        Self { values }
    }

    pub fn into_settings(
        self,
        section: SettingsSection,
        now: DateTime<Utc>,
    ) -> Result<Settings, ApiError> {
        let settings = Settings {
            section,
            values: self
                .values
                .into_iter()
                .map(|(k, v)| (k, v.trim().to_string()))
                .filter(|(_, v)| !v.is_empty())
                .collect(),
            updated_at: now,
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Public contact form. `website` is a honeypot left empty by people.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquirySubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub activity: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub website: String,
}

impl InquirySubmission {
    #[must_use]
    pub fn is_spam(&self) -> bool {
        !self.website.trim().is_empty()
    }

    pub fn into_inquiry(self, locale: Locale, now: DateTime<Utc>) -> Result<Inquiry, ApiError> {
        let inquiry = Inquiry::new(
            locale,
            &self.name,
            &self.email,
            &self.phone,
            self.activity.as_deref(),
            &self.message,
            now,
        );
        inquiry.validate()?;
        Ok(inquiry)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevalidateRequest {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RevalidateRequest {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.tags.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub removed: usize,
    pub paths: Vec<String>,
    pub tags: Vec<String>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub path: String,
    pub backend: String,
    pub bytes: u64,
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    DbToFiles,
    FilesToDb,
}

impl SyncDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DbToFiles => "db-to-files",
            Self::FilesToDb => "files-to-db",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ApiError> {
        match input.trim() {
            "db-to-files" => Ok(Self::DbToFiles),
            "files-to-db" => Ok(Self::FilesToDb),
            other => Err(ApiError::invalid_param("direction", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncRequest {
    pub direction: SyncDirection,
    /// Collection names; empty means all.
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResponse {
    pub direction: SyncDirection,
    pub dry_run: bool,
    pub report: SyncReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStatus {
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

impl From<WriteOutcome> for StorageStatus {
    fn from(value: WriteOutcome) -> Self {
        Self {
            degraded: value.degraded,
            failures: value.failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationResponse<T> {
    pub data: T,
    pub storage: StorageStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}
