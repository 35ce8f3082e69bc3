//! Comparison and reconciliation between two content stores.

use crate::backend::ContentStore;
use crate::document::Document;
use crate::error::StoreError;
use ridgeline_model::Collection;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionDrift {
    pub only_in_left: Vec<String>,
    pub only_in_right: Vec<String>,
    pub differing: Vec<String>,
    pub matching: usize,
}

impl CollectionDrift {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.only_in_left.is_empty() && self.only_in_right.is_empty() && self.differing.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub left: String,
    pub right: String,
    pub collections: BTreeMap<Collection, CollectionDrift>,
}

impl DriftReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.collections.values().all(CollectionDrift::is_clean)
    }

    #[must_use]
    pub fn drifted_count(&self) -> usize {
        self.collections
            .values()
            .map(|d| d.only_in_left.len() + d.only_in_right.len() + d.differing.len())
            .sum()
    }
}

fn hashes(docs: Vec<Document>) -> BTreeMap<String, String> {
    docs.into_iter()
        .map(|d| {
            let hash = d.content_hash();
            (d.id, hash)
        })
        .collect()
}

/// Ids present on one side only, and ids whose canonical bodies differ.
pub fn drift_report(
    left: &dyn ContentStore,
    right: &dyn ContentStore,
    collections: &[Collection],
) -> Result<DriftReport, StoreError> {
    let mut out = BTreeMap::new();
    for &collection in collections {
        let l = hashes(left.list(collection)?);
        let r = hashes(right.list(collection)?);
        let mut drift = CollectionDrift::default();
        for (id, hash) in &l {
            match r.get(id) {
                None => drift.only_in_left.push(id.clone()),
                Some(other) if other != hash => drift.differing.push(id.clone()),
                Some(_) => drift.matching += 1,
            }
        }
        drift.only_in_right = r.keys().filter(|id| !l.contains_key(*id)).cloned().collect();
        out.insert(collection, drift);
    }
    Ok(DriftReport {
        left: left.backend_name().to_string(),
        right: right.backend_name().to_string(),
        collections: out,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub collections: Vec<Collection>,
    /// Overwrite documents in the target even when the target copy is newer.
    pub force: bool,
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            collections: Collection::ALL.to_vec(),
            force: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub copied: usize,
    pub unchanged: usize,
    pub skipped_newer: Vec<String>,
    pub failed: Vec<String>,
}

/// Copy every document of `from` into `to`. Failures are collected per
/// document instead of aborting the run.
pub fn sync_stores(
    from: &dyn ContentStore,
    to: &dyn ContentStore,
    options: &SyncOptions,
) -> Result<SyncReport, StoreError> {
    let mut report = SyncReport::default();
    for &collection in &options.collections {
        for doc in from.list(collection)? {
            let key = format!("{collection}/{}", doc.id);
            let existing = match to.get(collection, &doc.id) {
                Ok(existing) => existing,
                Err(e) => {
                    report.failed.push(format!("{key}: {e}"));
                    continue;
                }
            };
            if let Some(existing) = existing {
                if existing.content_hash() == doc.content_hash() {
                    report.unchanged += 1;
                    continue;
                }
                if !options.force && existing.updated_at > doc.updated_at {
                    report.skipped_newer.push(key);
                    continue;
                }
            }
            if options.dry_run {
                report.copied += 1;
                continue;
            }
            match to.put(&doc) {
                Ok(_) => report.copied += 1,
                Err(e) => {
                    tracing::warn!(document = %key, error = %e, "sync copy failed");
                    report.failed.push(format!("{key}: {e}"));
                }
            }
        }
    }
    tracing::info!(
        from = from.backend_name(),
        to = to.backend_name(),
        copied = report.copied,
        unchanged = report.unchanged,
        skipped = report.skipped_newer.len(),
        failed = report.failed.len(),
        dry_run = options.dry_run,
        "content sync finished"
    );
    Ok(report)
}
