use crate::{CliError, OutputMode, SyncDirection};
use ridgeline_model::{Activity, Collection, ContentDocument, Inquiry, Page, Settings};
use ridgeline_store::paths::{collection_dir, validate_document_id};
use ridgeline_store::{
    drift_report, sync_stores, ContentStore, Document, DocumentDb, FileMirror, SyncOptions,
};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub(crate) struct ContentIssue {
    pub(crate) collection: Collection,
    pub(crate) file: String,
    pub(crate) message: String,
}

pub(crate) fn validate(content: &Path, output: OutputMode) -> Result<(), CliError> {
    if !content.is_dir() {
        return Err(CliError::validation(
            "content_root_missing",
            &format!("{} is not a directory", content.display()),
        ));
    }
    let mirror = FileMirror::new(content);
    let mut checked = 0usize;
    let mut issues = Vec::new();
    for collection in Collection::ALL {
        for (file, id) in json_files(&collection_dir(content, collection))
            .map_err(|e| CliError::dependency(e.to_string()))?
        {
            checked += 1;
            if let Err(message) = check_file(&mirror, collection, &id) {
                issues.push(ContentIssue {
                    collection,
                    file,
                    message,
                });
            }
        }
    }

    let human = if issues.is_empty() {
        format!("content validation: OK ({checked} documents)")
    } else {
        let mut lines = vec![format!(
            "content validation: {} of {checked} documents invalid",
            issues.len()
        )];
        lines.extend(
            issues
                .iter()
                .map(|i| format!("  {}/{}: {}", i.collection, i.file, i.message)),
        );
        lines.join("\n")
    };
    output.emit(
        &json!({"checked": checked, "valid": issues.is_empty(), "issues": issues}),
        &human,
    )?;
    if issues.is_empty() {
        Ok(())
    } else {
        Err(CliError::validation(
            "content_invalid",
            &format!("{} content documents failed validation", issues.len()),
        ))
    }
}

/// `(file name, stem)` of every JSON file directly under `dir`, sorted.
fn json_files(dir: &Path) -> std::io::Result<Vec<(String, String)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut out = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let (Some(name), Some(stem)) = (
            path.file_name().and_then(|s| s.to_str()),
            path.file_stem().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        out.push((name.to_string(), stem.to_string()));
    }
    out.sort();
    Ok(out)
}

fn check_file(mirror: &FileMirror, collection: Collection, id: &str) -> Result<(), String> {
    validate_document_id(id).map_err(|e| e.to_string())?;
    let doc = mirror
        .get(collection, id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "file disappeared while validating".to_string())?;
    match collection {
        Collection::Activities => check_typed::<Activity>(doc),
        Collection::Pages => check_typed::<Page>(doc),
        Collection::Settings => check_typed::<Settings>(doc),
        Collection::Inquiries => check_typed::<Inquiry>(doc),
    }
}

fn check_typed<T: ContentDocument>(doc: Document) -> Result<(), String> {
    let file_id = doc.id.clone();
    let value: T = doc.into_typed().map_err(|e| e.to_string())?;
    value.validate_document().map_err(|e| e.to_string())?;
    let id = value.document_id();
    if id != file_id {
        return Err(format!("document id `{id}` does not match its file name"));
    }
    Ok(())
}

fn open_existing_db(path: &Path) -> Result<DocumentDb, CliError> {
    if !path.is_file() {
        return Err(CliError::validation(
            "database_missing",
            &format!("document database {} does not exist", path.display()),
        ));
    }
    DocumentDb::open(path).map_err(|e| CliError::dependency(e.to_string()))
}

pub(crate) fn drift(
    db_path: &Path,
    content: &Path,
    collections: &[Collection],
    output: OutputMode,
) -> Result<(), CliError> {
    let db = open_existing_db(db_path)?;
    let mirror = FileMirror::new(content);
    let report = drift_report(&db, &mirror, collections)
        .map_err(|e| CliError::dependency(e.to_string()))?;

    let mut human = vec![format!(
        "drift {} vs {}: {}",
        report.left,
        report.right,
        if report.is_clean() { "clean" } else { "drifted" }
    )];
    for (collection, d) in &report.collections {
        if d.is_clean() {
            human.push(format!("  {collection}: {} matching", d.matching));
            continue;
        }
        human.push(format!(
            "  {collection}: {} matching, db only {:?}, files only {:?}, differing {:?}",
            d.matching, d.only_in_left, d.only_in_right, d.differing
        ));
    }
    output.emit(
        &json!({
            "clean": report.is_clean(),
            "drifted": report.drifted_count(),
            "report": report,
        }),
        &human.join("\n"),
    )?;
    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::validation(
            "drift_detected",
            &format!("{} documents differ between stores", report.drifted_count()),
        ))
    }
}

pub(crate) struct SyncArgs {
    pub(crate) db: PathBuf,
    pub(crate) content: PathBuf,
    pub(crate) direction: SyncDirection,
    pub(crate) force: bool,
    pub(crate) dry_run: bool,
    pub(crate) collections: Vec<Collection>,
}

pub(crate) fn sync(args: SyncArgs, output: OutputMode) -> Result<(), CliError> {
    let db = match args.direction {
        SyncDirection::DbToFiles => open_existing_db(&args.db)?,
        SyncDirection::FilesToDb => {
            DocumentDb::open(&args.db).map_err(|e| CliError::dependency(e.to_string()))?
        }
    };
    let mirror = FileMirror::new(&args.content);
    let (from, to) = match args.direction {
        SyncDirection::DbToFiles => (&db as &dyn ContentStore, &mirror as &dyn ContentStore),
        SyncDirection::FilesToDb => (&mirror as &dyn ContentStore, &db as &dyn ContentStore),
    };
    let options = SyncOptions {
        collections: args.collections,
        force: args.force,
        dry_run: args.dry_run,
    };
    let report = sync_stores(from, to, &options).map_err(|e| CliError::dependency(e.to_string()))?;

    let mut human = format!(
        "sync {} -> {}{}: copied {}, unchanged {}, skipped newer {}, failed {}",
        from.backend_name(),
        to.backend_name(),
        if options.dry_run { " (dry run)" } else { "" },
        report.copied,
        report.unchanged,
        report.skipped_newer.len(),
        report.failed.len()
    );
    for skipped in &report.skipped_newer {
        human.push_str(&format!("\n  kept newer {skipped} (use --force to overwrite)"));
    }
    for failed in &report.failed {
        human.push_str(&format!("\n  failed {failed}"));
    }
    output.emit(
        &json!({
            "from": from.backend_name(),
            "to": to.backend_name(),
            "dry_run": options.dry_run,
            "report": report,
        }),
        &human,
    )?;
    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::dependency(format!(
            "{} documents failed to sync",
            report.failed.len()
        )))
    }
}

/// Export always overwrites: the target directory mirrors the database.
pub(crate) fn export(
    db_path: &Path,
    out: &Path,
    collections: &[Collection],
    output: OutputMode,
) -> Result<(), CliError> {
    let db = open_existing_db(db_path)?;
    fs::create_dir_all(out).map_err(|e| CliError::dependency(format!("{}: {e}", out.display())))?;
    let mirror = FileMirror::new(out);
    let options = SyncOptions {
        collections: collections.to_vec(),
        force: true,
        dry_run: false,
    };
    let report = sync_stores(&db, &mirror, &options).map_err(|e| CliError::dependency(e.to_string()))?;
    let counts = db
        .counts()
        .map_err(|e| CliError::dependency(e.to_string()))?
        .into_iter()
        .filter(|(c, _)| collections.contains(c))
        .map(|(c, n)| (c.as_str().to_string(), n))
        .collect::<std::collections::BTreeMap<_, _>>();

    output.emit(
        &json!({
            "out": out.display().to_string(),
            "documents": counts,
            "report": report,
        }),
        &format!(
            "exported {} documents to {} ({} unchanged, {} failed)",
            report.copied,
            out.display(),
            report.unchanged,
            report.failed.len()
        ),
    )?;
    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::dependency(format!(
            "{} documents failed to export",
            report.failed.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_files_ignores_other_extensions_and_missing_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(json_files(&dir.path().join("absent")).expect("missing").is_empty());
        fs::write(dir.path().join("b.json"), "{}").expect("write");
        fs::write(dir.path().join("a.json"), "{}").expect("write");
        fs::write(dir.path().join("a.es.md"), "x").expect("write");
        let files = json_files(dir.path()).expect("list");
        assert_eq!(
            files,
            vec![
                ("a.json".to_string(), "a".to_string()),
                ("b.json".to_string(), "b".to_string())
            ]
        );
    }

    #[test]
    fn settings_file_named_after_another_section_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings_dir = dir.path().join("settings");
        fs::create_dir_all(&settings_dir).expect("mkdir");
        fs::write(
            settings_dir.join("social.json"),
            r#"{"section":"contact","values":{},"updated_at":"2024-05-01T00:00:00Z"}"#,
        )
        .expect("write");
        let mirror = FileMirror::new(dir.path());
        let err = check_file(&mirror, Collection::Settings, "social").expect_err("mismatch");
        assert!(err.contains("does not match"), "{err}");
    }
}
