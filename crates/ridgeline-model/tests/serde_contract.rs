use ridgeline_model::{
    Activity, Collection, ContentDocument, Difficulty, Locale, Page, PageKind, Settings,
    SettingsSection,
};
use serde_json::json;

#[test]
fn activity_accepts_minimal_document_with_defaults() {
    let raw = json!({
        "slug": "canyoning",
        "difficulty": "challenging",
        "duration_minutes": 240,
        "translations": {
            "en": {"title": "Canyoning"},
            "es": {"title": "Barranquismo", "body": "## Ruta\nDescenso de cascadas."}
        }
    });
    let activity: Activity = serde_json::from_value(raw).expect("activity");
    assert_eq!(activity.difficulty, Difficulty::Challenging);
    assert!(!activity.published);
    assert!(activity.gallery.is_empty());
    assert_eq!(activity.document_id(), "canyoning");
    assert_eq!(Activity::COLLECTION, Collection::Activities);
    activity.validate().expect("valid");
}

#[test]
fn activity_rejects_bad_slug_and_locale_keys() {
    let bad_slug = json!({
        "slug": "Canyoning Tour",
        "difficulty": "easy",
        "duration_minutes": 60,
        "translations": {"en": {"title": "x"}}
    });
    assert!(serde_json::from_value::<Activity>(bad_slug).is_err());

    let bad_locale = json!({
        "slug": "canyoning",
        "difficulty": "easy",
        "duration_minutes": 60,
        "translations": {"english": {"title": "x"}}
    });
    assert!(serde_json::from_value::<Activity>(bad_locale).is_err());
}

#[test]
fn translation_falls_back_to_default_locale() {
    let raw = json!({
        "slug": "zip-line",
        "difficulty": "easy",
        "duration_minutes": 90,
        "translations": {"en": {"title": "Zip line"}}
    });
    let activity: Activity = serde_json::from_value(raw).expect("activity");
    let es = Locale::parse("es").expect("es");
    let en = Locale::parse("en").expect("en");
    assert_eq!(
        activity.translation(&es, &en).map(|t| t.title.as_str()),
        Some("Zip line")
    );
}

#[test]
fn page_and_settings_use_stable_ids() {
    let page: Page = serde_json::from_value(json!({
        "kind": "about",
        "locale": "es",
        "title": "Quiénes somos"
    }))
    .expect("page");
    assert_eq!(page.kind, PageKind::About);
    assert_eq!(page.document_id(), "about.es");

    let settings: Settings = serde_json::from_value(json!({
        "section": "social",
        "values": {"instagram": "https://instagram.com/ridgeline"}
    }))
    .expect("settings");
    assert_eq!(settings.section, SettingsSection::Social);
    assert_eq!(settings.document_id(), "social");
    settings.validate_document().expect("valid settings");
}
