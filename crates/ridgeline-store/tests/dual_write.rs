// SPDX-License-Identifier: Apache-2.0

use chrono::Utc;
use ridgeline_model::Collection;
use ridgeline_store::{
    BackendHealth, ContentStore, Document, DocumentDb, DualWriteStore, FileMirror, StorageMode,
    StoreError, StoreErrorCode, WriteOutcome, DEGRADED_LOG_CAPACITY,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

/// Backend that rejects every call.
struct Broken(StoreErrorCode);

impl ContentStore for Broken {
    fn backend_name(&self) -> &'static str {
        "broken"
    }

    fn list(&self, _: Collection) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::new(self.0, "backend down"))
    }

    fn get(&self, _: Collection, _: &str) -> Result<Option<Document>, StoreError> {
        Err(StoreError::new(self.0, "backend down"))
    }

    fn put(&self, _: &Document) -> Result<WriteOutcome, StoreError> {
        Err(StoreError::new(self.0, "backend down"))
    }

    fn delete(&self, _: Collection, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::new(self.0, "backend down"))
    }

    fn health(&self) -> Vec<BackendHealth> {
        vec![BackendHealth::failing("broken", "backend down")]
    }
}

fn settings_doc(id: &str) -> Document {
    Document {
        collection: Collection::Settings,
        id: id.to_string(),
        body: json!({"section": id, "values": {}}),
        updated_at: Utc::now(),
    }
}

#[test]
fn healthy_backends_receive_every_write() {
    let dir = tempdir().expect("tempdir");
    let db = Arc::new(DocumentDb::open_in_memory().expect("db"));
    let files = Arc::new(FileMirror::new(dir.path()));
    let store = DualWriteStore::new(db.clone(), files.clone(), StorageMode::Dual);

    let outcome = store.put(&settings_doc("site")).expect("put");
    assert!(!outcome.degraded);
    assert!(db.get(Collection::Settings, "site").expect("db").is_some());
    assert!(dir.path().join("settings/site.json").exists());

    assert!(store.delete(Collection::Settings, "site").expect("delete"));
    assert!(!store.delete(Collection::Settings, "site").expect("delete again"));
    assert_eq!(store.write_report().writes_ok, 1);
}

#[test]
fn database_failure_still_counts_the_file_write() {
    let dir = tempdir().expect("tempdir");
    let files = Arc::new(FileMirror::new(dir.path()));
    let store = DualWriteStore::new(
        Arc::new(Broken(StoreErrorCode::Database)),
        files,
        StorageMode::Dual,
    );

    let outcome = store.put(&settings_doc("site")).expect("degraded put succeeds");
    assert!(outcome.degraded);
    assert!(outcome.failures[0].contains("broken"));

    // Reads fall back to the mirror.
    let doc = store.get(Collection::Settings, "site").expect("get").expect("some");
    assert_eq!(doc.id, "site");
    assert_eq!(store.list(Collection::Settings).expect("list").len(), 1);

    let report = store.write_report();
    assert_eq!(report.writes_degraded, 1);
    assert_eq!(report.db_failures, 1);
    assert_eq!(report.file_failures, 0);
    assert_eq!(report.recent_degraded[0].failed_backend, "broken");
    assert!(report.read_fallbacks >= 2);
}

#[test]
fn file_failure_still_counts_the_database_write() {
    let db = Arc::new(DocumentDb::open_in_memory().expect("db"));
    let store = DualWriteStore::new(
        db.clone(),
        Arc::new(Broken(StoreErrorCode::Io)),
        StorageMode::Dual,
    );
    let outcome = store.put(&settings_doc("social")).expect("put");
    assert!(outcome.degraded);
    assert!(db.get(Collection::Settings, "social").expect("get").is_some());
    assert_eq!(store.write_report().file_failures, 1);

    assert!(store.delete(Collection::Settings, "social").expect("delete"));
}

#[test]
fn database_miss_with_broken_mirror_reads_as_absent() {
    let db = Arc::new(DocumentDb::open_in_memory().expect("db"));
    let store = DualWriteStore::new(db, Arc::new(Broken(StoreErrorCode::Io)), StorageMode::Dual);

    let found = store.get(Collection::Settings, "contact").expect("db answered");
    assert!(found.is_none());
    let report = store.write_report();
    assert_eq!(report.file_failures, 1);
    assert_eq!(report.read_fallbacks, 0);
}

#[test]
fn both_failures_surface_the_database_error_code() {
    let store = DualWriteStore::new(
        Arc::new(Broken(StoreErrorCode::Database)),
        Arc::new(Broken(StoreErrorCode::Io)),
        StorageMode::Dual,
    );
    let err = store.put(&settings_doc("site")).expect_err("both down");
    assert_eq!(err.code, StoreErrorCode::Database);
    assert!(err.message.contains("both backends"));
    assert_eq!(store.write_report().writes_failed, 1);
    assert!(store.delete(Collection::Settings, "site").is_err());
}

#[test]
fn empty_database_lists_from_files() {
    let dir = tempdir().expect("tempdir");
    let files = Arc::new(FileMirror::new(dir.path()));
    files.put(&settings_doc("contact")).expect("seed files");
    let store = DualWriteStore::new(
        Arc::new(DocumentDb::open_in_memory().expect("db")),
        files,
        StorageMode::Dual,
    );
    let ids: Vec<String> = store
        .list(Collection::Settings)
        .expect("list")
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec!["contact"]);
}

#[test]
fn degraded_log_is_bounded_and_newest_first() {
    let store = DualWriteStore::new(
        Arc::new(Broken(StoreErrorCode::Database)),
        Arc::new(DocumentDb::open_in_memory().expect("stand-in")),
        StorageMode::Dual,
    );
    for i in 0..(DEGRADED_LOG_CAPACITY + 10) {
        store
            .put(&Document {
                collection: Collection::Inquiries,
                id: format!("inq-{i:04}"),
                body: json!({}),
                updated_at: Utc::now(),
            })
            .expect("put");
    }
    let report = store.write_report();
    assert_eq!(report.recent_degraded.len(), DEGRADED_LOG_CAPACITY);
    assert_eq!(
        report.recent_degraded[0].id,
        format!("inq-{:04}", DEGRADED_LOG_CAPACITY + 9)
    );
    assert_eq!(report.writes_degraded, (DEGRADED_LOG_CAPACITY + 10) as u64);
}

#[test]
fn single_backend_modes_ignore_the_other_side() {
    let store = DualWriteStore::new(
        Arc::new(DocumentDb::open_in_memory().expect("db")),
        Arc::new(Broken(StoreErrorCode::Io)),
        StorageMode::DatabaseOnly,
    );
    let outcome = store.put(&settings_doc("site")).expect("put");
    assert!(!outcome.degraded);
    assert_eq!(store.health().len(), 1);
    assert_eq!(StorageMode::parse("files-only").expect("mode"), StorageMode::FilesOnly);
    assert!(StorageMode::parse("mirror").is_err());
}
