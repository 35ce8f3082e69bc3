use crate::document::Document;
use crate::error::StoreError;
use ridgeline_model::Collection;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendHealth {
    pub backend: String,
    pub healthy: bool,
    pub detail: String,
}

impl BackendHealth {
    #[must_use]
    pub fn ok(backend: &str, detail: impl Into<String>) -> Self {
        Self {
            backend: backend.to_string(),
            healthy: true,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn failing(backend: &str, detail: impl Into<String>) -> Self {
        Self {
            backend: backend.to_string(),
            healthy: false,
            detail: detail.into(),
        }
    }
}

/// Result of a write that may have reached only some backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub degraded: bool,
    pub failures: Vec<String>,
}

impl WriteOutcome {
    #[must_use]
    pub fn clean() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn degraded(failure: String) -> Self {
        Self {
            degraded: true,
            failures: vec![failure],
        }
    }
}

pub trait ContentStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Documents of `collection`, ordered by id.
    fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert or replace.
    fn put(&self, doc: &Document) -> Result<WriteOutcome, StoreError>;

    /// `Ok(false)` when nothing was stored under `id`.
    fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;

    fn health(&self) -> Vec<BackendHealth>;
}

impl<T: ContentStore + ?Sized> ContentStore for Arc<T> {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        (**self).list(collection)
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        (**self).get(collection, id)
    }

    fn put(&self, doc: &Document) -> Result<WriteOutcome, StoreError> {
        (**self).put(doc)
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        (**self).delete(collection, id)
    }

    fn health(&self) -> Vec<BackendHealth> {
        (**self).health()
    }
}
