// SPDX-License-Identifier: Apache-2.0

use chrono::{Duration, TimeZone, Utc};
use ridgeline_model::{
    Activity, ActivityTranslation, Collection, Difficulty, Inquiry, Locale, Page, PageKind,
    SettingsSection, Slug,
};
use ridgeline_store::{
    drift_report, sync_stores, ContentRepository, ContentStore, DocumentDb, DualWriteStore,
    FileMirror, StorageMode, SyncOptions,
};
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn en() -> Locale {
    Locale::parse("en").expect("en")
}

fn activity(slug: &str, sort_order: i32, featured: bool, published: bool) -> Activity {
    let mut translations = BTreeMap::new();
    translations.insert(
        en(),
        ActivityTranslation {
            title: format!("Title {slug}"),
            summary: "Short".to_string(),
            body: format!("## {slug}\n\nDetails."),
            highlights: vec!["Guides".to_string()],
            includes: Vec::new(),
        },
    );
    Activity {
        slug: Slug::parse(slug).expect("slug"),
        category: "water".to_string(),
        difficulty: Difficulty::Easy,
        duration_minutes: 90,
        price: None,
        min_age: Some(8),
        max_group_size: Some(12),
        cover_image: "rafting.jpg".to_string(),
        gallery: Vec::new(),
        featured,
        published,
        sort_order,
        translations,
        updated_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("time"),
    }
}

fn dual(root: &std::path::Path) -> (Arc<DocumentDb>, Arc<FileMirror>, DualWriteStore) {
    let db = Arc::new(DocumentDb::open(&root.join("db/ridgeline.sqlite")).expect("db"));
    let files = Arc::new(FileMirror::new(root.join("content")));
    let store = DualWriteStore::new(db.clone(), files.clone(), StorageMode::Dual);
    (db, files, store)
}

#[test]
fn repository_orders_and_filters_activities() {
    let dir = tempdir().expect("tempdir");
    let (_, _, store) = dual(dir.path());
    let repo = ContentRepository::new(store);
    repo.save_activity(&activity("zipline", 1, true, true)).expect("save");
    repo.save_activity(&activity("canyoning", 1, false, true)).expect("save");
    repo.save_activity(&activity("rafting", 0, true, false)).expect("save");

    let slugs = |list: Vec<Activity>| -> Vec<String> {
        list.into_iter().map(|a| a.slug.to_string()).collect()
    };
    assert_eq!(
        slugs(repo.activities().expect("all")),
        vec!["rafting", "canyoning", "zipline"]
    );
    assert_eq!(
        slugs(repo.published_activities().expect("published")),
        vec!["canyoning", "zipline"]
    );
    assert_eq!(slugs(repo.featured_activities().expect("featured")), vec!["zipline"]);

    let slug = Slug::parse("rafting").expect("slug");
    let loaded = repo.activity(&slug).expect("get").expect("some");
    assert_eq!(loaded.translations[&en()].body, "## rafting\n\nDetails.");
    assert!(repo.delete_activity(&slug).expect("delete"));
    assert!(repo.activity(&slug).expect("get").is_none());
}

#[test]
fn pages_settings_and_inquiries_round_trip() {
    let dir = tempdir().expect("tempdir");
    let (_, _, store) = dual(dir.path());
    let repo = ContentRepository::new(store);

    let page = Page {
        kind: PageKind::About,
        locale: en(),
        title: "About us".to_string(),
        subtitle: String::new(),
        hero_image: String::new(),
        body: "We guide rivers.".to_string(),
        meta_description: String::new(),
        updated_at: Utc::now(),
    };
    repo.save_page(&page).expect("save page");
    assert_eq!(
        fs::read_to_string(dir.path().join("content/pages/about.en.md")).expect("md"),
        "We guide rivers."
    );
    assert_eq!(repo.page(PageKind::About, &en()).expect("page"), Some(page));
    assert!(repo.page(PageKind::Home, &en()).expect("home").is_none());

    let empty = repo.settings(SettingsSection::Social).expect("settings");
    assert!(empty.values.is_empty());
    assert_eq!(repo.all_settings().expect("all").len(), 3);

    let older = Inquiry::new(en(), "Ana", "ana@example.com", "", None, "First", Utc::now() - Duration::hours(1));
    let newer = Inquiry::new(en(), "Luis", "luis@example.com", "", None, "Second", Utc::now());
    repo.save_inquiry(&older).expect("save");
    repo.save_inquiry(&newer).expect("save");
    let ids: Vec<String> = repo.inquiries().expect("list").into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![newer.id.clone(), older.id.clone()]);
}

#[test]
fn missing_translation_falls_back_to_the_default_locale_page() {
    let dir = tempdir().expect("tempdir");
    let (_, _, store) = dual(dir.path());
    let repo = ContentRepository::new(store);
    let es = Locale::parse("es").expect("es");
    let spanish = Page {
        kind: PageKind::About,
        locale: es.clone(),
        title: "Sobre nosotros".to_string(),
        subtitle: String::new(),
        hero_image: String::new(),
        body: "Guiamos ríos.".to_string(),
        meta_description: String::new(),
        updated_at: Utc::now(),
    };
    repo.save_page(&spanish).expect("save page");

    let served = repo
        .page_or_default(PageKind::About, &en(), &es)
        .expect("lookup");
    assert_eq!(served, Some(spanish.clone()));
    assert_eq!(
        repo.page_or_default(PageKind::About, &es, &es).expect("lookup"),
        Some(spanish)
    );
    assert!(repo
        .page_or_default(PageKind::Contact, &en(), &es)
        .expect("lookup")
        .is_none());
}

#[test]
fn hand_edits_show_up_as_drift_and_sync_repairs_them() {
    let dir = tempdir().expect("tempdir");
    let (db, files, store) = dual(dir.path());
    let repo = ContentRepository::new(store);
    repo.save_activity(&activity("rafting", 0, false, true)).expect("save");
    repo.save_activity(&activity("canyoning", 0, false, true)).expect("save");

    let clean = drift_report(db.as_ref(), files.as_ref(), &Collection::ALL).expect("drift");
    assert!(clean.is_clean(), "{clean:?}");

    fs::write(
        dir.path().join("content/activities/rafting.en.md"),
        "Edited by hand",
    )
    .expect("edit");
    db.delete(Collection::Activities, "canyoning").expect("drop row");

    let report = drift_report(db.as_ref(), files.as_ref(), &[Collection::Activities]).expect("drift");
    let activities = &report.collections[&Collection::Activities];
    assert_eq!(activities.differing, vec!["rafting"]);
    assert_eq!(activities.only_in_right, vec!["canyoning"]);
    assert_eq!(report.drifted_count(), 2);

    // Both file copies carry the same updated_at as the rows, so force is not needed.
    let sync = sync_stores(files.as_ref(), db.as_ref(), &SyncOptions::default()).expect("sync");
    assert_eq!(sync.copied, 2);
    assert!(sync.failed.is_empty());
    assert!(drift_report(db.as_ref(), files.as_ref(), &Collection::ALL)
        .expect("drift")
        .is_clean());
}

#[test]
fn sync_keeps_newer_target_documents_unless_forced() {
    let dir = tempdir().expect("tempdir");
    let (db, files, _) = dual(dir.path());
    let mut old = activity("rafting", 0, false, true);
    let doc_old = ridgeline_store::Document::from_typed(&old).expect("doc");
    files.put(&doc_old).expect("files");
    old.updated_at += Duration::days(1);
    old.category = "river".to_string();
    db.put(&ridgeline_store::Document::from_typed(&old).expect("doc")).expect("db");

    let dry = SyncOptions {
        dry_run: true,
        ..SyncOptions::default()
    };
    let report = sync_stores(files.as_ref(), db.as_ref(), &dry).expect("sync");
    assert_eq!(report.skipped_newer, vec!["activities/rafting"]);

    let forced = SyncOptions {
        force: true,
        ..SyncOptions::default()
    };
    let report = sync_stores(files.as_ref(), db.as_ref(), &forced).expect("sync");
    assert_eq!(report.copied, 1);
    let row = db.get(Collection::Activities, "rafting").expect("get").expect("row");
    assert_eq!(row.body["category"], "water");
}
