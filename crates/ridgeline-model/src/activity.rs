use crate::collection::{Collection, ContentDocument};
use crate::locale::{Locale, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const SLUG_MAX_LEN: usize = 96;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("slug must not be empty".to_string()));
        }
        if s.len() > SLUG_MAX_LEN {
            return Err(ValidationError(format!(
                "slug exceeds max length {SLUG_MAX_LEN}"
            )));
        }
        let well_formed = s
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        if !well_formed {
            return Err(ValidationError(format!(
                "slug must be lowercase words joined by single hyphens, got `{s}`"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Derive a slug from a free-form title.
    pub fn from_title(title: &str) -> Result<Self, ValidationError> {
        let mut slug = ridgeline_core::slugify(title);
        slug.truncate(SLUG_MAX_LEN);
        Self::parse(slug.trim_end_matches('-'))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Slug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Moderate,
    Challenging,
    Extreme,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Moderate,
        Difficulty::Challenging,
        Difficulty::Extreme,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Moderate => "moderate",
            Self::Challenging => "challenging",
            Self::Extreme => "extreme",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let needle = input.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == needle)
            .ok_or_else(|| ValidationError(format!("unknown difficulty `{input}`")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount_cents: u64,
    pub currency: String,
}

impl Price {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError(format!(
                "currency must be a 3-letter uppercase ISO code, got `{}`",
                self.currency
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{} {}.{:02}",
            self.currency,
            self.amount_cents / 100,
            self.amount_cents % 100
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTranslation {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Markdown.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub slug: Slug,
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
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.translations.is_empty() {
            return Err(ValidationError(format!(
                "activity `{}` needs at least one translation",
                self.slug
            )));
        }
        for (locale, t) in &self.translations {
            if t.title.trim().is_empty() {
                return Err(ValidationError(format!(
                    "activity `{}` has an empty title for locale `{locale}`",
                    self.slug
                )));
            }
        }
        if self.duration_minutes == 0 {
            return Err(ValidationError(format!(
                "activity `{}` must have a positive duration",
                self.slug
            )));
        }
        if let Some(price) = &self.price {
            price.validate()?;
        }
        if self.max_group_size == Some(0) {
            return Err(ValidationError(
                "max_group_size must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Requested locale, then `fallback`, then whatever translation exists.
    #[must_use]
    pub fn translation(&self, locale: &Locale, fallback: &Locale) -> Option<&ActivityTranslation> {
        self.translations
            .get(locale)
            .or_else(|| self.translations.get(fallback))
            .or_else(|| self.translations.values().next())
    }

    #[must_use]
    pub fn duration_label(&self) -> String {
        let hours = self.duration_minutes / 60;
        let minutes = self.duration_minutes % 60;
        match (hours, minutes) {
            (0, m) => format!("{m} min"),
            (h, 0) => format!("{h} h"),
            (h, m) => format!("{h} h {m} min"),
        }
    }

    #[must_use]
    pub fn cache_tags(&self) -> Vec<String> {
        vec![
            "activities".to_string(),
            format!("activity:{}", self.slug),
        ]
    }

    /// Public paths whose rendering depends on this activity.
    #[must_use]
    pub fn public_paths(&self, locales: &[Locale]) -> Vec<String> {
        locales
            .iter()
            .flat_map(|l| {
                [
                    format!("/{l}"),
                    format!("/{l}/activities"),
                    format!("/{l}/activities/{}", self.slug),
                ]
            })
            .collect()
    }
}

impl ContentDocument for Activity {
    const COLLECTION: Collection = Collection::Activities;

    fn document_id(&self) -> String {
        self.slug.to_string()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn validate_document(&self) -> Result<(), ValidationError> {
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_rules() {
        assert!(Slug::parse("white-water-rafting").is_ok());
        assert!(Slug::parse("White-Water").is_err());
        assert!(Slug::parse("double--hyphen").is_err());
        assert!(Slug::parse("-leading").is_err());
        assert_eq!(
            Slug::from_title("Canopy Tour & Zip-Line").expect("slug").as_str(),
            "canopy-tour-zip-line"
        );
    }

    #[test]
    fn duration_labels() {
        let mut a = sample();
        a.duration_minutes = 45;
        assert_eq!(a.duration_label(), "45 min");
        a.duration_minutes = 120;
        assert_eq!(a.duration_label(), "2 h");
        a.duration_minutes = 210;
        assert_eq!(a.duration_label(), "3 h 30 min");
    }

    #[test]
    fn price_display_pads_cents() {
        let p = Price {
            amount_cents: 8505,
            currency: "USD".to_string(),
        };
        assert_eq!(p.display(), "USD 85.05");
        assert!(Price {
            amount_cents: 1,
            currency: "usd".to_string()
        }
        .validate()
        .is_err());
    }

    pub(crate) fn sample() -> Activity {
        let mut translations = BTreeMap::new();
        translations.insert(
            Locale::parse("en").expect("en"),
            ActivityTranslation {
                title: "Rafting".to_string(),
                ..ActivityTranslation::default()
            },
        );
        Activity {
            slug: Slug::parse("rafting").expect("slug"),
            category: "water".to_string(),
            difficulty: Difficulty::Moderate,
            duration_minutes: 180,
            price: None,
            min_age: None,
            max_group_size: None,
            cover_image: String::new(),
            gallery: Vec::new(),
            featured: false,
            published: true,
            sort_order: 0,
            translations,
            updated_at: Utc::now(),
        }
    }
}
