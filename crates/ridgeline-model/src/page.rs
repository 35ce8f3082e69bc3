use crate::collection::{Collection, ContentDocument};
use crate::locale::{Locale, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Home,
    About,
    Contact,
}

impl PageKind {
    pub const ALL: [PageKind; 3] = [PageKind::Home, PageKind::About, PageKind::Contact];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::About => "about",
            Self::Contact => "contact",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let needle = input.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| ValidationError(format!("unknown page kind `{input}`")))
    }

    #[must_use]
    pub fn public_path(self, locale: &Locale) -> String {
        match self {
            Self::Home => format!("/{locale}"),
            other => format!("/{locale}/{}", other.as_str()),
        }
    }

    #[must_use]
    pub fn cache_tag(self) -> String {
        format!("page:{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub kind: PageKind,
    pub locale: Locale,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub hero_image: String,
    /// Markdown.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Page {
    #[must_use]
    pub fn id_for(kind: PageKind, locale: &Locale) -> String {
        format!("{}.{}", kind.as_str(), locale)
    }

    pub fn parse_id(id: &str) -> Result<(PageKind, Locale), ValidationError> {
        let (kind, locale) = id
            .split_once('.')
            .ok_or_else(|| ValidationError(format!("page id must be `<kind>.<locale>`, got `{id}`")))?;
        Ok((PageKind::parse(kind)?, Locale::parse(locale)?))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError(format!(
                "page `{}` needs a title",
                Self::id_for(self.kind, &self.locale)
            )));
        }
        if self.meta_description.chars().count() > 320 {
            return Err(ValidationError(
                "meta_description must be at most 320 characters".to_string(),
            ));
        }
        Ok(())
    }
}

impl ContentDocument for Page {
    const COLLECTION: Collection = Collection::Pages;

    fn document_id(&self) -> String {
        Self::id_for(self.kind, &self.locale)
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
    fn ids_round_trip_through_parse() {
        let es = Locale::parse("es").expect("es");
        let id = Page::id_for(PageKind::About, &es);
        assert_eq!(id, "about.es");
        assert_eq!(Page::parse_id(&id).expect("parse"), (PageKind::About, es));
        assert!(Page::parse_id("about").is_err());
        assert!(Page::parse_id("blog.en").is_err());
    }

    #[test]
    fn home_lives_at_locale_root() {
        let en = Locale::parse("en").expect("en");
        assert_eq!(PageKind::Home.public_path(&en), "/en");
        assert_eq!(PageKind::Contact.public_path(&en), "/en/contact");
    }
}
