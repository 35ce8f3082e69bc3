#![forbid(unsafe_code)]
//! Ridgeline web service: localized public pages, the admin API and panel,
//! image uploads, cache revalidation and the debug dashboard.

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use ridgeline_api::ApiError;
use ridgeline_store::{ContentRepository, ContentStore, DocumentDb, DualWriteStore, FileMirror, StoreError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tracing::{info, warn};

mod cache;
pub mod config;
mod debug;
mod http;
pub mod media;
mod middleware;
pub mod render;
mod telemetry;

pub use cache::{CachedPage, PageCache, PageCacheStats};
pub use config::{validate_startup_config, RateLimitConfig, SiteConfig, UploadBackendConfig};
pub use media::{MediaError, MediaUploader, StoredMedia, UploadRequest};

use media::build_uploader;
use telemetry::metrics::RequestMetrics;
use telemetry::rate_limiter::RateLimiter;
use telemetry::redis_backend::RedisBackend;

pub const CRATE_NAME: &str = "ridgeline-server";
pub const SESSION_COOKIE: &str = "ridgeline_admin";

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub type Repository = ContentRepository<Arc<DualWriteStore>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SiteConfig>,
    pub store: Arc<DualWriteStore>,
    pub repo: Arc<Repository>,
    pub media: Arc<dyn MediaUploader>,
    pub ready: Arc<AtomicBool>,
    pub(crate) page_cache: Arc<Mutex<PageCache>>,
    /// Held across the existence check and save of a new activity.
    pub(crate) create_lock: Arc<Mutex<()>>,
    pub(crate) contact_limiter: Arc<RateLimiter>,
    pub(crate) login_limiter: Arc<RateLimiter>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(config: SiteConfig, store: Arc<DualWriteStore>, media: Arc<dyn MediaUploader>) -> Self {
        let redis = config.redis_url.as_deref().and_then(|url| {
            let timeout = Duration::from_millis(config.redis_timeout_ms);
            match RedisBackend::new(url, &config.redis_prefix, timeout) {
                Ok(backend) => Some(backend),
                Err(e) => {
                    warn!("redis disabled, using in-memory rate limits: {e}");
                    None
                }
            }
        });
        let page_cache = PageCache::new(config.page_cache_ttl, config.page_cache_max_entries);
        Self {
            repo: Arc::new(ContentRepository::new(store.clone())),
            store,
            media,
            ready: Arc::new(AtomicBool::new(true)),
            page_cache: Arc::new(Mutex::new(page_cache)),
            create_lock: Arc::new(Mutex::new(())),
            contact_limiter: Arc::new(RateLimiter::new(redis.clone(), "contact")),
            login_limiter: Arc::new(RateLimiter::new(redis, "login")),
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
            config: Arc::new(config),
        }
    }

    /// Open the document database and file mirror named in `config` and
    /// build the configured upload backend.
    pub fn from_config(config: SiteConfig) -> Result<Self, String> {
        let db = DocumentDb::open(&config.db_path)
            .map_err(|e| format!("open document db {}: {e}", config.db_path.display()))?;
        let files = FileMirror::new(config.content_root.clone());
        let store = Arc::new(DualWriteStore::new(
            Arc::new(db),
            Arc::new(files),
            config.storage_mode,
        ));
        let media = build_uploader(&config).map_err(|e| format!("upload backend: {e}"))?;
        info!(
            storage_mode = config.storage_mode.as_str(),
            upload_backend = media.backend_name(),
            "content store ready"
        );
        Ok(Self::new(config, store, media))
    }

    /// Run blocking repository work off the async executor.
    pub(crate) async fn with_repo<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Repository) -> Result<T, StoreError> + Send + 'static,
    {
        let repo = self.repo.clone();
        tokio::task::spawn_blocking(move || f(&repo))
            .await
            .map_err(|e| ApiError::internal(format!("repository task failed: {e}")))?
            .map_err(ApiError::from)
    }

    /// Drop cached pages by path and by tag; returns how many entries went.
    pub(crate) async fn invalidate(&self, paths: &[String], tags: &[String]) -> usize {
        let mut cache = self.page_cache.lock().await;
        cache.invalidate_paths(paths) + cache.invalidate_tags(tags)
    }

    pub(crate) async fn page_cache_stats(&self) -> PageCacheStats {
        self.page_cache.lock().await.stats()
    }

    /// Ready when the flag is set and at least one content backend answers.
    pub(crate) async fn is_ready(&self) -> bool {
        if !self.ready.load(Ordering::Relaxed) {
            return false;
        }
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.health().iter().any(|h| h.healthy))
            .await
            .unwrap_or(false)
    }
}

fn admin_api_router(state: &AppState) -> Router<AppState> {
    use http::admin_api as api;
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    Router::new()
        .route(
            "/api/admin/activities",
            get(api::list_activities).post(api::create_activity),
        )
        .route(
            "/api/admin/activities/:slug",
            get(api::get_activity)
                .put(api::put_activity)
                .delete(api::delete_activity),
        )
        .route("/api/admin/pages", get(api::list_pages))
        .route(
            "/api/admin/pages/:kind/:locale",
            get(api::get_page).put(api::put_page).delete(api::delete_page),
        )
        .route("/api/admin/settings", get(api::list_settings))
        .route(
            "/api/admin/settings/:section",
            get(api::get_settings).put(api::put_settings),
        )
        .route("/api/admin/inquiries", get(api::list_inquiries))
        .route(
            "/api/admin/upload",
            post(http::uploads::upload_handler)
                .layer(DefaultBodyLimit::max(upload_limit))
                .delete(http::uploads::delete_upload_handler),
        )
        .route("/api/admin/sync/drift", get(api::drift_handler))
        .route("/api/admin/sync", post(api::sync_handler))
        .route("/api/admin/debug", get(api::debug_handler))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::admin_auth::require_admin_api,
        ))
}

fn admin_panel_router(state: &AppState) -> Router<AppState> {
    use http::admin_panel as panel;
    let protected = Router::new()
        .route("/admin", get(panel::overview_handler))
        .route(
            "/admin/settings/:section",
            get(panel::settings_form_handler).post(panel::settings_save_handler),
        )
        .route("/admin/debug", get(panel::debug_dashboard_handler))
        .route("/admin/logout", post(panel::logout_handler))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::admin_auth::require_admin_html,
        ));
    Router::new()
        .route(
            "/admin/login",
            get(panel::login_form_handler).post(panel::login_handler),
        )
        .merge(protected)
}

pub fn build_router(state: AppState) -> Router {
    use http::{ops, public, revalidate};
    let public_root = state.config.public_root.clone();
    Router::new()
        .route("/", get(public::root_redirect))
        .route("/healthz", get(ops::healthz_handler))
        .route("/readyz", get(ops::readyz_handler))
        .route("/metrics", get(ops::metrics_handler))
        .route("/api/version", get(ops::version_handler))
        .route("/api/openapi.json", get(ops::openapi_handler))
        .route("/api/revalidate", post(revalidate::revalidate_handler))
        .route("/api/revalidate/all", post(revalidate::revalidate_all_handler))
        .merge(admin_api_router(&state))
        .merge(admin_panel_router(&state))
        .route("/:locale", get(public::home_handler))
        .route("/:locale/activities", get(public::activities_handler))
        .route("/:locale/activities/:slug", get(public::activity_handler))
        .route("/:locale/about", get(public::about_handler))
        .route(
            "/:locale/contact",
            get(public::contact_handler).post(public::contact_submit_handler),
        )
        .nest_service("/uploads", ServeDir::new(public_root.join("uploads")))
        .nest_service("/images", ServeDir::new(public_root.join("images")))
        .nest_service("/assets", ServeDir::new(public_root.join("assets")))
        .fallback(public::fallback_handler)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_tracing::request_tracing_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}
