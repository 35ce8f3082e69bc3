#![forbid(unsafe_code)]
//! Ridgeline content model SSOT.
//!
//! Every document the site renders (activities, localized pages, settings
//! sections, contact inquiries) is defined here together with its validation
//! rules. Storage and HTTP layers only move these types around.

mod activity;
mod collection;
mod inquiry;
mod labels;
mod locale;
mod page;
mod settings;

pub use activity::{Activity, ActivityTranslation, Difficulty, Price, Slug, SLUG_MAX_LEN};
pub use collection::{Collection, ContentDocument};
pub use inquiry::{Inquiry, INQUIRY_MESSAGE_MAX_LEN};
pub use labels::{ui_labels, UiLabels};
pub use locale::{Locale, LocaleSet, ValidationError};
pub use page::{Page, PageKind};
pub use settings::{Settings, SettingsSection};

pub const CRATE_NAME: &str = "ridgeline-model";
