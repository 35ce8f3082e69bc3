use crate::collection::{Collection, ContentDocument};
use crate::locale::{Locale, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const INQUIRY_MESSAGE_MAX_LEN: usize = 4000;

/// A contact-form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: String,
    pub locale: Locale,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub activity: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Inquiry {
    #[must_use]
    pub fn new(
        locale: Locale,
        name: &str,
        email: &str,
        phone: &str,
        activity: Option<&str>,
        message: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        let fingerprint = ridgeline_core::short_hash(
            format!("{email}\n{message}\n{}", created_at.timestamp_nanos_opt().unwrap_or(0))
                .as_bytes(),
            8,
        );
        Self {
            id: format!("{}-{fingerprint}", created_at.format("%Y%m%d%H%M%S")),
            locale,
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            phone: phone.trim().to_string(),
            activity: activity
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(ToString::to_string),
            message: message.trim().to_string(),
            created_at,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError("name is required".to_string()));
        }
        let email = self.email.trim();
        let plausible = email
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
        if !plausible {
            return Err(ValidationError("a valid email is required".to_string()));
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError("message is required".to_string()));
        }
        if self.message.chars().count() > INQUIRY_MESSAGE_MAX_LEN {
            return Err(ValidationError(format!(
                "message must be at most {INQUIRY_MESSAGE_MAX_LEN} characters"
            )));
        }
        Ok(())
    }
}

impl ContentDocument for Inquiry {
    const COLLECTION: Collection = Collection::Inquiries;

    fn document_id(&self) -> String {
        self.id.clone()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate_document(&self) -> Result<(), ValidationError> {
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn id_is_time_prefixed_and_fields_are_trimmed() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().expect("time");
        let inquiry = Inquiry::new(
            Locale::parse("en").expect("en"),
            "  Ana ",
            "ana@example.com",
            "",
            Some("  "),
            "Is the canyon tour open in May?",
            at,
        );
        assert!(inquiry.id.starts_with("20260301093000-"));
        assert_eq!(inquiry.name, "Ana");
        assert_eq!(inquiry.activity, None);
        assert!(inquiry.validate().is_ok());
    }

    #[test]
    fn rejects_implausible_email() {
        let inquiry = Inquiry::new(
            Locale::parse("es").expect("es"),
            "Luis",
            "luis@localhost",
            "",
            None,
            "Hola",
            Utc::now(),
        );
        assert!(inquiry.validate().is_err());
    }
}
