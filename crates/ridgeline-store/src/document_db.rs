// SPDX-License-Identifier: Apache-2.0

use crate::backend::{BackendHealth, ContentStore, WriteOutcome};
use crate::document::Document;
use crate::error::{StoreError, StoreErrorCode};
use crate::paths::validate_document_id;
use chrono::{DateTime, Utc};
use ridgeline_model::Collection;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);
";

/// Document database: one SQLite table keyed by `(collection, id)` with the
/// JSON body stored as text.
pub struct DocumentDb {
    conn: Mutex<Connection>,
    location: Option<PathBuf>,
}

impl DocumentDb {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;")?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, location: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::new(StoreErrorCode::Internal, "document db lock poisoned"))
    }

    /// Row count per collection, for the debug dashboard.
    pub fn counts(&self) -> Result<Vec<(Collection, u64)>, StoreError> {
        let conn = self.lock()?;
        let mut out = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![collection.as_str()],
                |row| row.get(0),
            )?;
            out.push((collection, u64::try_from(n).unwrap_or(0)));
        }
        Ok(out)
    }
}

fn decode_row(
    collection: Collection,
    id: String,
    body: &str,
    updated_at: &str,
) -> Result<Document, StoreError> {
    let body = serde_json::from_str(body).map_err(|e| {
        StoreError::new(
            StoreErrorCode::Serialization,
            format!("stored body of {collection}/{id} is not JSON: {e}"),
        )
    })?;
    let updated_at = DateTime::parse_from_rfc3339(updated_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::new(
                StoreErrorCode::Database,
                format!("bad updated_at for {collection}/{id}: {e}"),
            )
        })?;
    Ok(Document {
        collection,
        id,
        body,
        updated_at,
    })
}

impl ContentStore for DocumentDb {
    fn backend_name(&self) -> &'static str {
        "document_db"
    }

    fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, body, updated_at FROM documents WHERE collection = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![collection.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, body, updated_at) = row?;
            out.push(decode_row(collection, id, &body, &updated_at)?);
        }
        Ok(out)
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        validate_document_id(id)?;
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT body, updated_at FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection.as_str(), id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        row.map(|(body, updated_at)| decode_row(collection, id.to_string(), &body, &updated_at))
            .transpose()
    }

    fn put(&self, doc: &Document) -> Result<WriteOutcome, StoreError> {
        validate_document_id(&doc.id)?;
        let body = serde_json::to_string(&doc.body)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (collection, id, body, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![
                doc.collection.as_str(),
                doc.id,
                body,
                doc.updated_at.to_rfc3339()
            ],
        )?;
        Ok(WriteOutcome::clean())
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        validate_document_id(id)?;
        let conn = self.lock()?;
        let n = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
        )?;
        Ok(n > 0)
    }

    fn health(&self) -> Vec<BackendHealth> {
        let check = self
            .lock()
            .and_then(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?));
        let name = self.backend_name();
        let health = match check {
            Ok(_) => BackendHealth::ok(
                name,
                self.location
                    .as_ref()
                    .map_or_else(|| "in-memory".to_string(), |p| p.display().to_string()),
            ),
            Err(e) => BackendHealth::failing(name, e.to_string()),
        };
        vec![health]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, title: &str) -> Document {
        Document {
            collection: Collection::Pages,
            id: id.to_string(),
            body: json!({"title": title}),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_replaces_and_list_is_ordered() {
        let db = DocumentDb::open_in_memory().expect("db");
        db.put(&doc("home.en", "one")).expect("put");
        db.put(&doc("about.en", "two")).expect("put");
        db.put(&doc("home.en", "three")).expect("put");
        let ids: Vec<String> = db
            .list(Collection::Pages)
            .expect("list")
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["about.en", "home.en"]);
        let home = db.get(Collection::Pages, "home.en").expect("get").expect("some");
        assert_eq!(home.body["title"], "three");
        assert!(db.list(Collection::Settings).expect("empty").is_empty());
    }

    #[test]
    fn delete_reports_whether_a_row_existed() {
        let db = DocumentDb::open_in_memory().expect("db");
        db.put(&doc("home.en", "x")).expect("put");
        assert!(db.delete(Collection::Pages, "home.en").expect("delete"));
        assert!(!db.delete(Collection::Pages, "home.en").expect("delete again"));
        assert_eq!(db.counts().expect("counts")[1], (Collection::Pages, 0));
    }

    #[test]
    fn file_backed_db_reports_healthy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = DocumentDb::open(&dir.path().join("nested/ridgeline.sqlite")).expect("open");
        let health = db.health();
        assert!(health[0].healthy, "{health:?}");
    }
}
