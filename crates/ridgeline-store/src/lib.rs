// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Content persistence.
//!
//! Two backends hold the same documents: a SQLite document table
//! ([`DocumentDb`]) and a directory of JSON/Markdown files ([`FileMirror`])
//! that editors can also change by hand. [`DualWriteStore`] writes both on a
//! best-effort basis and [`drift`] reports where they disagree.

mod backend;
mod document;
mod document_db;
pub mod drift;
mod dual_write;
mod error;
mod file_mirror;
pub mod paths;
mod repository;

pub use backend::{BackendHealth, ContentStore, WriteOutcome};
pub use document::Document;
pub use document_db::DocumentDb;
pub use drift::{drift_report, sync_stores, CollectionDrift, DriftReport, SyncOptions, SyncReport};
pub use dual_write::{DegradedWrite, DualWriteStore, StorageMode, WriteReport, DEGRADED_LOG_CAPACITY};
pub use error::{StoreError, StoreErrorCode};
pub use file_mirror::FileMirror;
pub use repository::ContentRepository;

pub const CRATE_NAME: &str = "ridgeline-store";
