use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

/// `xx` or `xx-yy`, lowercase ASCII letters only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim().to_ascii_lowercase().replace('_', "-");
        let valid_part = |p: &str| p.len() == 2 && p.chars().all(|c| c.is_ascii_lowercase());
        let ok = match s.split_once('-') {
            None => valid_part(&s),
            Some((lang, region)) => valid_part(lang) && valid_part(region),
        };
        if !ok {
            return Err(ValidationError(format!(
                "locale must look like `en` or `es-cr`, got `{input}`"
            )));
        }
        Ok(Self(s))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Language subtag (`es` for `es-cr`).
    #[must_use]
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Locale {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Locale {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(value: Locale) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSet {
    default: Locale,
    supported: Vec<Locale>,
}

/// Spanish first, English second: the site's home market.
impl Default for LocaleSet {
    fn default() -> Self {
        Self {
            default: Locale("es".to_string()),
            supported: vec![Locale("es".to_string()), Locale("en".to_string())],
        }
    }
}

impl LocaleSet {
    pub fn new(default: Locale, supported: Vec<Locale>) -> Result<Self, ValidationError> {
        let mut deduped: Vec<Locale> = Vec::with_capacity(supported.len());
        for locale in supported {
            if !deduped.contains(&locale) {
                deduped.push(locale);
            }
        }
        if !deduped.contains(&default) {
            return Err(ValidationError(format!(
                "default locale `{default}` is not in the supported set"
            )));
        }
        Ok(Self {
            default,
            supported: deduped,
        })
    }

    /// Parse `"en,es"` style lists; the first entry is the default unless
    /// `default` names another one.
    pub fn from_list(list: &str, default: Option<&str>) -> Result<Self, ValidationError> {
        let supported = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Locale::parse)
            .collect::<Result<Vec<_>, _>>()?;
        let default = match default {
            Some(raw) => Locale::parse(raw)?,
            None => supported
                .first()
                .cloned()
                .ok_or_else(|| ValidationError("at least one locale is required".to_string()))?,
        };
        Self::new(default, supported)
    }

    #[must_use]
    pub fn default_locale(&self) -> &Locale {
        &self.default
    }

    #[must_use]
    pub fn supported(&self) -> &[Locale] {
        &self.supported
    }

    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<Locale> {
        let parsed = Locale::parse(raw).ok()?;
        self.supported.iter().find(|l| **l == parsed).cloned()
    }

    /// Pick a supported locale from an `Accept-Language` header.
    #[must_use]
    pub fn negotiate(&self, accept_language: Option<&str>) -> Locale {
        let Some(header) = accept_language else {
            return self.default.clone();
        };
        let mut ranked: Vec<(f32, usize, String)> = header
            .split(',')
            .enumerate()
            .filter_map(|(idx, part)| {
                let mut pieces = part.trim().split(';');
                let tag = pieces.next()?.trim().to_ascii_lowercase();
                if tag.is_empty() || tag == "*" {
                    return None;
                }
                let q = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|v| v.parse::<f32>().ok())
                    .unwrap_or(1.0);
                Some((q, idx, tag))
            })
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        for (_, _, tag) in ranked {
            if let Some(exact) = self.resolve(&tag) {
                return exact;
            }
            let primary = tag.split('-').next().unwrap_or(&tag);
            if let Some(found) = self.supported.iter().find(|l| l.primary() == primary) {
                return found.clone();
            }
        }
        self.default.clone()
    }
}
