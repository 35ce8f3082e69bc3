use crate::error::{StoreError, StoreErrorCode};
use ridgeline_model::Collection;
use std::path::{Path, PathBuf};

pub const DOCUMENT_ID_MAX_LEN: usize = 128;
pub const JSON_EXT: &str = "json";
pub const MARKDOWN_EXT: &str = "md";
pub const TMP_SUFFIX: &str = ".tmp";

/// Ids become file names, so only `[a-z0-9._-]` is accepted and the id
/// may not start with a dot or contain `..`.
pub fn validate_document_id(id: &str) -> Result<(), StoreError> {
    let reject = |why: &str| {
        Err(StoreError::new(
            StoreErrorCode::Validation,
            format!("invalid document id `{id}`: {why}"),
        ))
    };
    if id.is_empty() {
        return reject("empty");
    }
    if id.len() > DOCUMENT_ID_MAX_LEN {
        return reject("too long");
    }
    if id.starts_with('.') || id.contains("..") {
        return reject("relative segments are not allowed");
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return reject("only lowercase letters, digits, `.`, `_` and `-` are allowed");
    }
    Ok(())
}

#[must_use]
pub fn collection_dir(root: &Path, collection: Collection) -> PathBuf {
    root.join(collection.as_str())
}

#[must_use]
pub fn document_json_path(root: &Path, collection: Collection, id: &str) -> PathBuf {
    collection_dir(root, collection).join(format!("{id}.{JSON_EXT}"))
}

/// `activities/<slug>.<locale>.md`.
#[must_use]
pub fn activity_markdown_path(root: &Path, slug: &str, locale: &str) -> PathBuf {
    collection_dir(root, Collection::Activities).join(format!("{slug}.{locale}.{MARKDOWN_EXT}"))
}

/// `pages/<kind>.<locale>.md`; the page id already carries the locale.
#[must_use]
pub fn page_markdown_path(root: &Path, page_id: &str) -> PathBuf {
    collection_dir(root, Collection::Pages).join(format!("{page_id}.{MARKDOWN_EXT}"))
}

#[must_use]
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}
