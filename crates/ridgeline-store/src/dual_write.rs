// SPDX-License-Identifier: Apache-2.0

use crate::backend::{BackendHealth, ContentStore, WriteOutcome};
use crate::document::Document;
use crate::error::{StoreError, StoreErrorCode};
use chrono::{DateTime, Utc};
use ridgeline_model::Collection;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const DEGRADED_LOG_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    Dual,
    DatabaseOnly,
    FilesOnly,
}

impl StorageMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dual => "dual",
            Self::DatabaseOnly => "database_only",
            Self::FilesOnly => "files_only",
        }
    }

    pub fn parse(input: &str) -> Result<Self, StoreError> {
        match input.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "dual" => Ok(Self::Dual),
            "database_only" | "db" | "database" => Ok(Self::DatabaseOnly),
            "files_only" | "files" => Ok(Self::FilesOnly),
            other => Err(StoreError::new(
                StoreErrorCode::Validation,
                format!("unknown storage mode `{other}`"),
            )),
        }
    }
}

/// A write or delete that reached only one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedWrite {
    pub at: DateTime<Utc>,
    pub operation: &'static str,
    pub collection: Collection,
    pub id: String,
    pub failed_backend: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub mode: StorageMode,
    pub writes_ok: u64,
    pub writes_degraded: u64,
    pub writes_failed: u64,
    pub db_failures: u64,
    pub file_failures: u64,
    pub read_fallbacks: u64,
    pub recent_degraded: Vec<DegradedWrite>,
}

#[derive(Default)]
struct Counters {
    writes_ok: AtomicU64,
    writes_degraded: AtomicU64,
    writes_failed: AtomicU64,
    db_failures: AtomicU64,
    file_failures: AtomicU64,
    read_fallbacks: AtomicU64,
}

/// Writes every document to the database and the file mirror.
///
/// Neither write is ordered against concurrent writers and nothing is rolled
/// back: a document that reached one backend stays there. Only a failure of
/// both backends is an error.
pub struct DualWriteStore {
    db: Arc<dyn ContentStore>,
    files: Arc<dyn ContentStore>,
    mode: StorageMode,
    counters: Counters,
    recent: Mutex<VecDeque<DegradedWrite>>,
}

impl DualWriteStore {
    #[must_use]
    pub fn new(db: Arc<dyn ContentStore>, files: Arc<dyn ContentStore>, mode: StorageMode) -> Self {
        Self {
            db,
            files,
            mode,
            counters: Counters::default(),
            recent: Mutex::new(VecDeque::with_capacity(DEGRADED_LOG_CAPACITY)),
        }
    }

    #[must_use]
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    #[must_use]
    pub fn db(&self) -> &Arc<dyn ContentStore> {
        &self.db
    }

    #[must_use]
    pub fn files(&self) -> &Arc<dyn ContentStore> {
        &self.files
    }

    #[must_use]
    pub fn write_report(&self) -> WriteReport {
        let c = &self.counters;
        WriteReport {
            mode: self.mode,
            writes_ok: c.writes_ok.load(Ordering::Relaxed),
            writes_degraded: c.writes_degraded.load(Ordering::Relaxed),
            writes_failed: c.writes_failed.load(Ordering::Relaxed),
            db_failures: c.db_failures.load(Ordering::Relaxed),
            file_failures: c.file_failures.load(Ordering::Relaxed),
            read_fallbacks: c.read_fallbacks.load(Ordering::Relaxed),
            recent_degraded: self
                .recent
                .lock()
                .map(|q| q.iter().rev().cloned().collect())
                .unwrap_or_default(),
        }
    }

    fn record_degraded(
        &self,
        operation: &'static str,
        collection: Collection,
        id: &str,
        db_failed: bool,
        err: &StoreError,
    ) -> String {
        self.counters.writes_degraded.fetch_add(1, Ordering::Relaxed);
        let failed = if db_failed {
            self.counters.db_failures.fetch_add(1, Ordering::Relaxed);
            &self.db
        } else {
            self.counters.file_failures.fetch_add(1, Ordering::Relaxed);
            &self.files
        };
        tracing::warn!(
            operation,
            collection = %collection,
            id,
            backend = failed.backend_name(),
            error = %err,
            "content write reached only one backend"
        );
        if let Ok(mut q) = self.recent.lock() {
            if q.len() == DEGRADED_LOG_CAPACITY {
                q.pop_front();
            }
            q.push_back(DegradedWrite {
                at: Utc::now(),
                operation,
                collection,
                id: id.to_string(),
                failed_backend: failed.backend_name(),
                error: err.to_string(),
            });
        }
        format!("{}: {err}", failed.backend_name())
    }

    fn both_failed(&self, operation: &str, db_err: StoreError, file_err: &StoreError) -> StoreError {
        self.counters.writes_failed.fetch_add(1, Ordering::Relaxed);
        self.counters.db_failures.fetch_add(1, Ordering::Relaxed);
        self.counters.file_failures.fetch_add(1, Ordering::Relaxed);
        tracing::error!(operation, db_error = %db_err, file_error = %file_err, "content write failed on every backend");
        StoreError::new(
            db_err.code,
            format!("{operation} failed on both backends: {}; {file_err}", db_err.message),
        )
    }

    fn note_fallback(&self, collection: Collection, reason: &str) {
        self.counters.read_fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(collection = %collection, reason, "reading content from file mirror");
    }
}

impl ContentStore for DualWriteStore {
    fn backend_name(&self) -> &'static str {
        "dual_write"
    }

    fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        match self.mode {
            StorageMode::DatabaseOnly => return self.db.list(collection),
            StorageMode::FilesOnly => return self.files.list(collection),
            StorageMode::Dual => {}
        }
        match self.db.list(collection) {
            Ok(docs) if !docs.is_empty() => Ok(docs),
            Ok(empty) => {
                let from_files = self.files.list(collection).unwrap_or_default();
                if from_files.is_empty() {
                    Ok(empty)
                } else {
                    self.note_fallback(collection, "database empty");
                    Ok(from_files)
                }
            }
            Err(db_err) => {
                tracing::warn!(collection = %collection, error = %db_err, "database list failed");
                self.note_fallback(collection, "database error");
                self.files.list(collection)
            }
        }
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        match self.mode {
            StorageMode::DatabaseOnly => return self.db.get(collection, id),
            StorageMode::FilesOnly => return self.files.get(collection, id),
            StorageMode::Dual => {}
        }
        match self.db.get(collection, id) {
            Ok(Some(doc)) => Ok(Some(doc)),
            // The database answered; a broken mirror only loses the fallback.
            Ok(None) => match self.files.get(collection, id) {
                Ok(found) => {
                    if found.is_some() {
                        self.note_fallback(collection, "missing in database");
                    }
                    Ok(found)
                }
                Err(file_err) => {
                    self.counters.file_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(collection = %collection, id, error = %file_err, "file mirror read failed after database miss");
                    Ok(None)
                }
            },
            // Id validation fails identically on both sides.
            Err(e) if e.code == StoreErrorCode::Validation => Err(e),
            Err(db_err) => {
                tracing::warn!(collection = %collection, id, error = %db_err, "database read failed");
                self.note_fallback(collection, "database error");
                self.files.get(collection, id)
            }
        }
    }

    fn put(&self, doc: &Document) -> Result<WriteOutcome, StoreError> {
        match self.mode {
            StorageMode::DatabaseOnly => return self.db.put(doc),
            StorageMode::FilesOnly => return self.files.put(doc),
            StorageMode::Dual => {}
        }
        let db = self.db.put(doc);
        let files = self.files.put(doc);
        match (db, files) {
            (Ok(_), Ok(_)) => {
                self.counters.writes_ok.fetch_add(1, Ordering::Relaxed);
                Ok(WriteOutcome::clean())
            }
            (Err(e), Ok(_)) => Ok(WriteOutcome::degraded(self.record_degraded(
                "put",
                doc.collection,
                &doc.id,
                true,
                &e,
            ))),
            (Ok(_), Err(e)) => Ok(WriteOutcome::degraded(self.record_degraded(
                "put",
                doc.collection,
                &doc.id,
                false,
                &e,
            ))),
            (Err(db_err), Err(file_err)) => Err(self.both_failed("put", db_err, &file_err)),
        }
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        match self.mode {
            StorageMode::DatabaseOnly => return self.db.delete(collection, id),
            StorageMode::FilesOnly => return self.files.delete(collection, id),
            StorageMode::Dual => {}
        }
        let db = self.db.delete(collection, id);
        let files = self.files.delete(collection, id);
        match (db, files) {
            (Ok(a), Ok(b)) => Ok(a || b),
            (Err(e), Ok(b)) => {
                self.record_degraded("delete", collection, id, true, &e);
                Ok(b)
            }
            (Ok(a), Err(e)) => {
                self.record_degraded("delete", collection, id, false, &e);
                Ok(a)
            }
            (Err(db_err), Err(file_err)) => Err(self.both_failed("delete", db_err, &file_err)),
        }
    }

    fn health(&self) -> Vec<BackendHealth> {
        let mut out = Vec::new();
        if self.mode != StorageMode::FilesOnly {
            out.extend(self.db.health());
        }
        if self.mode != StorageMode::DatabaseOnly {
            out.extend(self.files.health());
        }
        out
    }
}
