//! Data behind the debug dashboard (`/admin/debug` and `/api/admin/debug`).

use crate::cache::PageCacheStats;
use crate::telemetry::redis_backend::RedisLimitStats;
use crate::AppState;
use chrono::{DateTime, Utc};
use ridgeline_model::Collection;
use ridgeline_store::{drift_report, BackendHealth, ContentStore, DriftReport, DualWriteStore, StorageMode, WriteReport};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RateLimitSnapshot {
    pub contact_tracked_keys: usize,
    pub login_tracked_keys: usize,
    pub redis: Option<RedisLimitStats>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DebugSnapshot {
    pub generated_at: DateTime<Utc>,
    pub version: &'static str,
    pub storage_mode: StorageMode,
    pub backends: Vec<BackendHealth>,
    pub writes: WriteReport,
    /// Document count per backend and collection.
    pub document_counts: BTreeMap<String, BTreeMap<Collection, usize>>,
    pub drift: Option<DriftReport>,
    pub drift_error: Option<String>,
    pub cache: PageCacheStats,
    pub cached_paths: Vec<String>,
    pub upload_backend: &'static str,
    pub rate_limits: RateLimitSnapshot,
    pub requests_total: u64,
    pub config: Value,
}

struct StorageView {
    backends: Vec<BackendHealth>,
    writes: WriteReport,
    document_counts: BTreeMap<String, BTreeMap<Collection, usize>>,
    drift: Result<DriftReport, String>,
}

fn storage_view(store: &DualWriteStore) -> StorageView {
    let mut document_counts = BTreeMap::new();
    for backend in [store.db(), store.files()] {
        let mut per = BTreeMap::new();
        for collection in Collection::ALL {
            match backend.list(collection) {
                Ok(docs) => {
                    per.insert(collection, docs.len());
                }
                Err(e) => tracing::warn!(
                    backend = backend.backend_name(),
                    %collection,
                    error = %e,
                    "debug: listing failed"
                ),
            }
        }
        document_counts.insert(backend.backend_name().to_string(), per);
    }
    StorageView {
        backends: store.health(),
        writes: store.write_report(),
        document_counts,
        drift: drift_report(store.db().as_ref(), store.files().as_ref(), &Collection::ALL)
            .map_err(|e| e.to_string()),
    }
}

pub(crate) async fn collect_snapshot(state: &AppState) -> DebugSnapshot {
    let store: Arc<DualWriteStore> = state.store.clone();
    let view = tokio::task::spawn_blocking(move || storage_view(&store)).await;
    let (backends, writes, document_counts, drift) = match view {
        Ok(v) => (v.backends, v.writes, v.document_counts, v.drift),
        Err(e) => (
            Vec::new(),
            state.store.write_report(),
            BTreeMap::new(),
            Err(format!("storage inspection task failed: {e}")),
        ),
    };
    let (cache, cached_paths) = {
        let cache = state.page_cache.lock().await;
        (cache.stats(), cache.paths())
    };
    DebugSnapshot {
        generated_at: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        storage_mode: state.store.mode(),
        backends,
        writes,
        document_counts,
        drift_error: drift.as_ref().err().cloned(),
        drift: drift.ok(),
        cache,
        cached_paths,
        upload_backend: state.media.backend_name(),
        rate_limits: RateLimitSnapshot {
            contact_tracked_keys: state.contact_limiter.tracked_keys().await,
            login_tracked_keys: state.login_limiter.tracked_keys().await,
            redis: state
                .contact_limiter
                .redis()
                .map(crate::telemetry::redis_backend::RedisBackend::stats),
        },
        requests_total: state.metrics.requests_total().await,
        config: state.config.redacted(),
    }
}
