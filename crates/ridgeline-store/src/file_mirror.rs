// SPDX-License-Identifier: Apache-2.0

use crate::backend::{BackendHealth, ContentStore, WriteOutcome};
use crate::document::Document;
use crate::error::{StoreError, StoreErrorCode};
use crate::paths::{
    activity_markdown_path, collection_dir, document_json_path, page_markdown_path, tmp_path_for,
    validate_document_id, JSON_EXT, MARKDOWN_EXT,
};
use chrono::{DateTime, Utc};
use ridgeline_core::canonical::stable_json_pretty;
use ridgeline_model::{Collection, Locale};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// JSON/Markdown mirror of the content, laid out for hand editing.
///
/// Markdown bodies of activities and pages live in `.md` siblings of the
/// JSON metadata; settings and inquiries are plain JSON.
#[derive(Debug, Clone)]
pub struct FileMirror {
    root: PathBuf,
}

impl FileMirror {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_activity(&self, id: &str, body: &Value) -> Result<(), StoreError> {
        let mut meta = body.clone();
        let mut bodies: Vec<(String, String)> = Vec::new();
        if let Some(translations) = meta.get_mut("translations").and_then(Value::as_object_mut) {
            for (locale, translation) in translations.iter_mut() {
                if let Some(obj) = translation.as_object_mut() {
                    let markdown = take_string(obj, "body");
                    bodies.push((locale.clone(), markdown));
                }
            }
        }
        write_json(&document_json_path(&self.root, Collection::Activities, id), &meta)?;
        for (locale, markdown) in &bodies {
            let path = activity_markdown_path(&self.root, id, locale);
            if markdown.is_empty() {
                remove_if_exists(&path)?;
            } else {
                write_atomic(&path, markdown.as_bytes())?;
            }
        }
        for (locale, path) in self.activity_markdown_files(id)? {
            if !bodies.iter().any(|(l, _)| *l == locale) {
                remove_if_exists(&path)?;
            }
        }
        Ok(())
    }

    fn write_page(&self, id: &str, body: &Value) -> Result<(), StoreError> {
        let mut meta = body.clone();
        let markdown = meta
            .as_object_mut()
            .map(|obj| take_string(obj, "body"))
            .unwrap_or_default();
        write_json(&document_json_path(&self.root, Collection::Pages, id), &meta)?;
        let md_path = page_markdown_path(&self.root, id);
        if markdown.is_empty() {
            remove_if_exists(&md_path)
        } else {
            write_atomic(&md_path, markdown.as_bytes())
        }
    }

    /// Locale-tagged markdown files next to an activity, as `(locale, path)`.
    fn activity_markdown_files(&self, slug: &str) -> Result<Vec<(String, PathBuf)>, StoreError> {
        let dir = collection_dir(&self.root, Collection::Activities);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let prefix = format!("{slug}.");
        let suffix = format!(".{MARKDOWN_EXT}");
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(locale) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(&suffix))
            else {
                continue;
            };
            if Locale::parse(locale).is_ok() {
                out.push((locale.to_string(), entry.path()));
            }
        }
        out.sort();
        Ok(out)
    }

    fn read_document(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let path = document_json_path(&self.root, collection, id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut body: Value = serde_json::from_str(&raw).map_err(|e| {
            StoreError::new(
                StoreErrorCode::Serialization,
                format!("{} is not valid JSON: {e}", path.display()),
            )
        })?;
        match collection {
            Collection::Activities => self.attach_activity_bodies(id, &mut body)?,
            Collection::Pages => {
                let markdown = read_optional(&page_markdown_path(&self.root, id))?;
                if let Some(obj) = body.as_object_mut() {
                    obj.insert("body".to_string(), Value::String(markdown));
                }
            }
            Collection::Settings | Collection::Inquiries => {}
        }
        let updated_at = match Document::timestamp_in_body(&body) {
            Some(t) => t,
            None => modified_at(&path)?,
        };
        Ok(Some(Document {
            collection,
            id: id.to_string(),
            body,
            updated_at,
        }))
    }

    fn attach_activity_bodies(&self, slug: &str, body: &mut Value) -> Result<(), StoreError> {
        let Some(translations) = body.get_mut("translations").and_then(Value::as_object_mut) else {
            return Ok(());
        };
        for (locale, translation) in translations.iter_mut() {
            if let Some(obj) = translation.as_object_mut() {
                let markdown = read_optional(&activity_markdown_path(&self.root, slug, locale))?;
                obj.insert("body".to_string(), Value::String(markdown));
            }
        }
        Ok(())
    }
}

fn take_string(obj: &mut Map<String, Value>, key: &str) -> String {
    match obj.remove(key) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

fn read_optional(path: &Path) -> Result<String, StoreError> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

fn modified_at(path: &Path) -> Result<DateTime<Utc>, StoreError> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

fn write_json(path: &Path, value: &Value) -> Result<(), StoreError> {
    let text = stable_json_pretty(value)?;
    write_atomic(path, text.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path_for(path);
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl ContentStore for FileMirror {
    fn backend_name(&self) -> &'static str {
        "file_mirror"
    }

    fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let dir = collection_dir(&self.root, collection);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(JSON_EXT) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_document_id(id).is_err() {
                tracing::warn!(path = %path.display(), "skipping content file with invalid id");
                continue;
            }
            ids.push(id.to_string());
        }
        ids.sort();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match self.read_document(collection, &id) {
                Ok(Some(doc)) => out.push(doc),
                Ok(None) => {}
                Err(e) if e.code == StoreErrorCode::Serialization => {
                    tracing::warn!(collection = %collection, id = %id, error = %e, "skipping malformed content file");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        validate_document_id(id)?;
        self.read_document(collection, id)
    }

    fn put(&self, doc: &Document) -> Result<WriteOutcome, StoreError> {
        validate_document_id(&doc.id)?;
        match doc.collection {
            Collection::Activities => self.write_activity(&doc.id, &doc.body)?,
            Collection::Pages => self.write_page(&doc.id, &doc.body)?,
            Collection::Settings | Collection::Inquiries => write_json(
                &document_json_path(&self.root, doc.collection, &doc.id),
                &doc.body,
            )?,
        }
        Ok(WriteOutcome::clean())
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        validate_document_id(id)?;
        let json = document_json_path(&self.root, collection, id);
        let existed = json.exists();
        remove_if_exists(&json)?;
        match collection {
            Collection::Activities => {
                for (_, path) in self.activity_markdown_files(id)? {
                    remove_if_exists(&path)?;
                }
            }
            Collection::Pages => remove_if_exists(&page_markdown_path(&self.root, id))?,
            Collection::Settings | Collection::Inquiries => {}
        }
        Ok(existed)
    }

    fn health(&self) -> Vec<BackendHealth> {
        let name = self.backend_name();
        let health = match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => {
                BackendHealth::ok(name, self.root.display().to_string())
            }
            Ok(_) => BackendHealth::failing(
                name,
                format!("{} is not a writable directory", self.root.display()),
            ),
            Err(e) => BackendHealth::failing(name, format!("{}: {e}", self.root.display())),
        };
        vec![health]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activity_doc(body_en: &str, body_es: &str) -> Document {
        Document {
            collection: Collection::Activities,
            id: "rafting".to_string(),
            body: json!({
                "slug": "rafting",
                "updated_at": "2026-03-01T09:30:00Z",
                "translations": {
                    "en": {"title": "Rafting", "body": body_en},
                    "es": {"title": "Rafting", "body": body_es}
                }
            }),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn activity_bodies_are_split_into_markdown_siblings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mirror = FileMirror::new(dir.path());
        mirror.put(&activity_doc("# Big water", "# Agua")).expect("put");

        let json = fs::read_to_string(dir.path().join("activities/rafting.json")).expect("json");
        assert!(!json.contains("Big water"));
        assert_eq!(
            fs::read_to_string(dir.path().join("activities/rafting.es.md")).expect("md"),
            "# Agua"
        );

        let back = mirror
            .get(Collection::Activities, "rafting")
            .expect("get")
            .expect("some");
        assert_eq!(back.body["translations"]["en"]["body"], "# Big water");
        assert_eq!(back.content_hash(), activity_doc("# Big water", "# Agua").content_hash());
        assert_eq!(back.updated_at.to_rfc3339(), "2026-03-01T09:30:00+00:00");
    }

    #[test]
    fn emptied_body_and_delete_remove_markdown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mirror = FileMirror::new(dir.path());
        mirror.put(&activity_doc("a", "b")).expect("put");
        mirror.put(&activity_doc("a", "")).expect("put");
        assert!(!dir.path().join("activities/rafting.es.md").exists());

        assert!(mirror.delete(Collection::Activities, "rafting").expect("delete"));
        assert!(!dir.path().join("activities/rafting.en.md").exists());
        assert!(!mirror.delete(Collection::Activities, "rafting").expect("again"));
    }

    #[test]
    fn list_skips_malformed_and_foreign_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mirror = FileMirror::new(dir.path());
        let settings = dir.path().join("settings");
        fs::create_dir_all(&settings).expect("mkdir");
        fs::write(settings.join("site.json"), r#"{"section":"site","values":{}}"#).expect("w");
        fs::write(settings.join("broken.json"), "{").expect("w");
        fs::write(settings.join("notes.txt"), "x").expect("w");
        fs::write(settings.join("Bad Name.json"), "{}").expect("w");
        let ids: Vec<String> = mirror
            .list(Collection::Settings)
            .expect("list")
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["site"]);
        assert!(mirror.list(Collection::Inquiries).expect("missing dir").is_empty());
    }

    #[test]
    fn traversal_ids_never_touch_the_filesystem() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mirror = FileMirror::new(dir.path().join("content"));
        let err = mirror
            .get(Collection::Pages, "../secrets")
            .expect_err("rejected");
        assert_eq!(err.code, StoreErrorCode::Validation);
    }
}
