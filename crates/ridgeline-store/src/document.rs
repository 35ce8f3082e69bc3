use crate::error::{StoreError, StoreErrorCode};
use chrono::{DateTime, Utc};
use ridgeline_core::canonical::stable_json_hash_hex;
use ridgeline_model::{Collection, ContentDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Untyped unit of storage shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub collection: Collection,
    pub id: String,
    pub body: Value,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Validate and serialize a typed document.
    pub fn from_typed<T: ContentDocument>(value: &T) -> Result<Self, StoreError> {
        value.validate_document()?;
        Ok(Self {
            collection: T::COLLECTION,
            id: value.document_id(),
            body: serde_json::to_value(value)?,
            updated_at: value.updated_at(),
        })
    }

    pub fn into_typed<T: ContentDocument>(self) -> Result<T, StoreError> {
        if self.collection != T::COLLECTION {
            return Err(StoreError::new(
                StoreErrorCode::Internal,
                format!(
                    "document {}/{} decoded as {}",
                    self.collection, self.id, T::COLLECTION
                ),
            ));
        }
        serde_json::from_value(self.body).map_err(|e| {
            StoreError::new(
                StoreErrorCode::Serialization,
                format!("{}/{} is malformed: {e}", self.collection, self.id),
            )
        })
    }

    /// Hash of the body with keys sorted, so copies compare equal across backends.
    #[must_use]
    pub fn content_hash(&self) -> String {
        stable_json_hash_hex(&self.body).unwrap_or_default()
    }

    /// Best timestamp found in a stored body (`updated_at`, then `created_at`).
    #[must_use]
    pub fn timestamp_in_body(body: &Value) -> Option<DateTime<Utc>> {
        ["updated_at", "created_at"].iter().find_map(|key| {
            body.get(*key)
                .and_then(Value::as_str)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|t| t.with_timezone(&Utc))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridgeline_model::{Settings, SettingsSection};

    #[test]
    fn typed_round_trip_keeps_collection_and_id() {
        let mut settings = Settings::empty(SettingsSection::Contact);
        settings
            .values
            .insert("email".to_string(), "hola@example.com".to_string());
        let doc = Document::from_typed(&settings).expect("document");
        assert_eq!(doc.collection, Collection::Settings);
        assert_eq!(doc.id, "contact");
        assert_eq!(Document::timestamp_in_body(&doc.body), Some(settings.updated_at));
        let back: Settings = doc.into_typed().expect("typed");
        assert_eq!(back, settings);
    }

    #[test]
    fn invalid_documents_are_rejected_before_storage() {
        let mut settings = Settings::empty(SettingsSection::Site);
        settings.values.insert("nope".to_string(), "x".to_string());
        let err = Document::from_typed(&settings).expect_err("unknown key");
        assert_eq!(err.code, StoreErrorCode::Validation);
    }
}
