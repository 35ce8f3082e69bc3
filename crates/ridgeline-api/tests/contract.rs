// SPDX-License-Identifier: Apache-2.0

use chrono::Utc;
use ridgeline_api::{
    map_error, openapi_v1_spec, parse_list_params, ActivityUpsert, ApiError, ApiErrorCode,
    InquirySubmission, PageUpsert, SettingsUpdate, SyncDirection, SyncRequest, API_ERROR_SCHEMA_REF,
    MAX_LIST_LIMIT,
};
use ridgeline_model::{Locale, PageKind, SettingsSection, Slug};
use ridgeline_store::{StoreError, StoreErrorCode};
use serde_json::json;
use std::collections::BTreeMap;

fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn error_envelope_shape_is_stable() {
    let err = ApiError::not_found("activity `x`").with_request_id("req-7");
    let body = serde_json::to_value(err.into_envelope()).expect("json");
    assert_eq!(body["error"]["code"], "NotFound");
    assert_eq!(body["error"]["request_id"], "req-7");
    assert!(body["error"]["details"].is_object());
}

#[test]
fn status_table_is_centralized() {
    let cases = [
        (ApiErrorCode::InvalidParameter, 400),
        (ApiErrorCode::Unauthorized, 401),
        (ApiErrorCode::NotFound, 404),
        (ApiErrorCode::Conflict, 409),
        (ApiErrorCode::PayloadTooLarge, 413),
        (ApiErrorCode::UnsupportedMediaType, 415),
        (ApiErrorCode::ValidationFailed, 422),
        (ApiErrorCode::RateLimited, 429),
        (ApiErrorCode::UploadFailed, 502),
        (ApiErrorCode::StorageUnavailable, 503),
        (ApiErrorCode::Internal, 500),
    ];
    for (code, status) in cases {
        let mapped = map_error(&ApiError::new(code, "x", json!({}), "req-1"));
        assert_eq!(mapped.status_code, status, "{code:?}");
        assert_eq!(mapped.schema_ref, API_ERROR_SCHEMA_REF);
    }
}

#[test]
fn store_errors_map_to_wire_codes() {
    let db_down: ApiError = StoreError::new(StoreErrorCode::Database, "locked").into();
    assert_eq!(db_down.code, ApiErrorCode::StorageUnavailable);
    let invalid: ApiError = StoreError::new(StoreErrorCode::Validation, "bad id").into();
    assert_eq!(invalid.code, ApiErrorCode::ValidationFailed);
}

#[test]
fn list_params_bounds_are_enforced() {
    let defaults = parse_list_params(&BTreeMap::new()).expect("defaults");
    assert_eq!((defaults.limit, defaults.offset), (50, 0));

    for bad in ["0", "-1", "abc", "201"] {
        let err = parse_list_params(&query(&[("limit", bad)])).expect_err(bad);
        assert_eq!(err.code, ApiErrorCode::InvalidParameter);
    }
    let max = MAX_LIST_LIMIT.to_string();
    assert_eq!(
        parse_list_params(&query(&[("limit", max.as_str())])).expect("max").limit,
        MAX_LIST_LIMIT
    );

    let parsed = parse_list_params(&query(&[("published", "true"), ("locale", "ES"), ("offset", "3")]))
        .expect("parsed");
    assert_eq!(parsed.published, Some(true));
    assert_eq!(parsed.locale, Some(Locale::parse("es").expect("es")));
    let page = parsed.paginate((0..10).collect::<Vec<_>>());
    assert_eq!(page.items, vec![3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(page.total, 10);

    assert!(parse_list_params(&query(&[("published", "maybe")])).is_err());
}

fn upsert(slug: Option<&str>) -> ActivityUpsert {
    serde_json::from_value(json!({
        "slug": slug,
        "difficulty": "moderate",
        "duration_minutes": 240,
        "gallery": [" a.jpg ", ""],
        "translations": {
            "es": {"title": "Cañón del Río"},
            "en": {"title": "River Canyon"}
        }
    }))
    .expect("upsert")
}

#[test]
fn activity_slug_resolution() {
    let es = Locale::parse("es").expect("es");
    let derived = upsert(None).into_activity(None, &es, Utc::now()).expect("derived");
    assert_eq!(derived.slug.as_str(), "canon-del-rio");
    assert_eq!(derived.gallery, vec!["a.jpg"]);

    let explicit = upsert(Some("canyon")).into_activity(None, &es, Utc::now()).expect("explicit");
    assert_eq!(explicit.slug.as_str(), "canyon");

    let path = Slug::parse("other").expect("slug");
    let err = upsert(Some("canyon"))
        .into_activity(Some(&path), &es, Utc::now())
        .expect_err("mismatch");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = serde_json::from_value::<ActivityUpsert>(json!({
        "difficulty": "easy",
        "duration_minutes": 10,
        "translations": {},
        "colour": "red"
    }));
    assert!(err.is_err());
}

#[test]
fn fetched_records_deserialize_as_upserts() {
    let es = Locale::parse("es").expect("es");
    let stored = upsert(Some("canyon")).into_activity(None, &es, Utc::now()).expect("activity");
    let echoed: ActivityUpsert =
        serde_json::from_value(serde_json::to_value(&stored).expect("encode")).expect("echo");
    let resaved = echoed
        .into_activity(Some(&stored.slug), &es, Utc::now())
        .expect("resave");
    assert_eq!(resaved.translations, stored.translations);

    let page = PageUpsert {
        kind: None,
        locale: None,
        updated_at: None,
        title: "Sobre nosotros".to_string(),
        subtitle: String::new(),
        hero_image: String::new(),
        body: "Guiamos ríos.".to_string(),
        meta_description: String::new(),
    }
    .into_page(PageKind::About, es.clone(), Utc::now())
    .expect("page");
    let echoed: PageUpsert =
        serde_json::from_value(serde_json::to_value(&page).expect("encode")).expect("echo");
    assert_eq!(echoed.kind, Some(PageKind::About));
    let moved = echoed
        .into_page(PageKind::Contact, Locale::parse("en").expect("en"), Utc::now())
        .expect("resave");
    assert_eq!((moved.kind, moved.title.as_str()), (PageKind::Contact, "Sobre nosotros"));
}

#[test]
fn settings_form_keeps_only_known_keys() {
    let form = query(&[("email", " hola@example.com "), ("csrf", "x"), ("phone", "")]);
    let update = SettingsUpdate::from_form(SettingsSection::Contact, &form);
    assert_eq!(update.values.len(), 2);
    let settings = update
        .into_settings(SettingsSection::Contact, Utc::now())
        .expect("settings");
    assert_eq!(settings.values.len(), 1);
    assert_eq!(settings.get("email"), Some("hola@example.com"));
}

#[test]
fn honeypot_and_inquiry_validation() {
    let spam = InquirySubmission {
        website: "http://spam".to_string(),
        ..InquirySubmission::default()
    };
    assert!(spam.is_spam());

    let incomplete = InquirySubmission {
        name: "Ana".to_string(),
        email: "ana@example.com".to_string(),
        ..InquirySubmission::default()
    };
    let err = incomplete
        .into_inquiry(Locale::parse("en").expect("en"), Utc::now())
        .expect_err("no message");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
}

#[test]
fn sync_request_uses_kebab_case_directions() {
    let req: SyncRequest =
        serde_json::from_value(json!({"direction": "files-to-db", "force": true})).expect("req");
    assert_eq!(req.direction, SyncDirection::FilesToDb);
    assert!(req.collections.is_empty());
    assert!(SyncDirection::parse("sideways").is_err());
}

#[test]
fn openapi_documents_every_admin_route_and_resolves_refs() {
    let spec = openapi_v1_spec();
    let paths = spec["paths"].as_object().expect("paths");
    for path in [
        "/api/admin/activities",
        "/api/admin/activities/{slug}",
        "/api/admin/pages/{kind}/{locale}",
        "/api/admin/settings/{section}",
        "/api/admin/inquiries",
        "/api/admin/upload",
        "/api/admin/sync",
        "/api/admin/sync/drift",
        "/api/admin/debug",
        "/api/revalidate",
        "/api/revalidate/all",
    ] {
        assert!(paths.contains_key(path), "{path}");
    }

    let text = serde_json::to_string(&spec).expect("json");
    let schemas = spec["components"]["schemas"].as_object().expect("schemas");
    for piece in text.split("#/components/schemas/").skip(1) {
        let name: String = piece.chars().take_while(|c| c.is_ascii_alphanumeric()).collect();
        assert!(schemas.contains_key(&name), "dangling ref {name}");
    }
}
