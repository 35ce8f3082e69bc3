#![forbid(unsafe_code)]

use opentelemetry::trace::TracerProvider as _;
use ridgeline_core::{resolve_content_root, resolve_db_path, ImageHosts};
use ridgeline_model::LocaleSet;
use ridgeline_server::{
    build_router, validate_startup_config, AppState, RateLimitConfig, SiteConfig,
    UploadBackendConfig,
};
use ridgeline_store::StorageMode;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_string_or(name: &str, default: &str) -> String {
    env_string(name).unwrap_or_else(|| default.to_string())
}

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn upload_backend_from_env(public_root: &Path) -> Result<UploadBackendConfig, String> {
    let backend = env_string_or("RIDGELINE_UPLOAD_BACKEND", "local");
    match backend.to_ascii_lowercase().as_str() {
        "local" => Ok(UploadBackendConfig::Local {
            public_root: public_root.to_path_buf(),
        }),
        "cloudinary" => Ok(UploadBackendConfig::Cloudinary {
            cloud_name: env_string_or("RIDGELINE_CLOUDINARY_CLOUD_NAME", ""),
            api_key: env_string_or("RIDGELINE_CLOUDINARY_API_KEY", ""),
            api_secret: env_string_or("RIDGELINE_CLOUDINARY_API_SECRET", ""),
            api_base_url: env_string_or(
                "RIDGELINE_CLOUDINARY_API_BASE_URL",
                "https://api.cloudinary.com",
            ),
            default_folder: env_string_or("RIDGELINE_CLOUDINARY_FOLDER", "ridgeline"),
        }),
        "r2" => Ok(UploadBackendConfig::R2 {
            account_id: env_string_or("RIDGELINE_R2_ACCOUNT_ID", ""),
            access_key_id: env_string_or("RIDGELINE_R2_ACCESS_KEY_ID", ""),
            secret_access_key: env_string_or("RIDGELINE_R2_SECRET_ACCESS_KEY", ""),
            bucket: env_string_or("RIDGELINE_R2_BUCKET", ""),
            public_base_url: env_string_or("RIDGELINE_R2_PUBLIC_BASE_URL", ""),
        }),
        other => Err(format!(
            "unsupported RIDGELINE_UPLOAD_BACKEND `{other}`; use local, cloudinary or r2"
        )),
    }
}

fn config_from_env() -> Result<SiteConfig, String> {
    let defaults = SiteConfig::default();
    let locales = match env_string("RIDGELINE_LOCALES") {
        Some(list) => {
            let default = env_string("RIDGELINE_DEFAULT_LOCALE");
            LocaleSet::from_list(&list, default.as_deref())
                .map_err(|e| format!("RIDGELINE_LOCALES: {e}"))?
        }
        None => defaults.locales.clone(),
    };
    let storage_mode = match env_string("RIDGELINE_STORAGE_MODE") {
        Some(raw) => StorageMode::parse(&raw).map_err(|e| format!("RIDGELINE_STORAGE_MODE: {e}"))?,
        None => defaults.storage_mode,
    };
    let public_root = env_string("RIDGELINE_PUBLIC_ROOT")
        .map_or_else(|| defaults.public_root.clone(), PathBuf::from);
    let upload = upload_backend_from_env(&public_root)?;
    let image_hosts = ImageHosts {
        cloudinary_cloud_name: match &upload {
            UploadBackendConfig::Cloudinary { cloud_name, .. } => Some(cloud_name.clone()),
            _ => env_string("RIDGELINE_CLOUDINARY_CLOUD_NAME"),
        },
        r2_public_base_url: match &upload {
            UploadBackendConfig::R2 { public_base_url, .. } => Some(public_base_url.clone()),
            _ => env_string("RIDGELINE_R2_PUBLIC_BASE_URL"),
        },
    };
    Ok(SiteConfig {
        bind_addr: env_string_or("RIDGELINE_BIND", &defaults.bind_addr),
        site_name: env_string_or("RIDGELINE_SITE_NAME", &defaults.site_name),
        locales,
        content_root: resolve_content_root(),
        db_path: resolve_db_path(),
        storage_mode,
        public_root,
        admin_tokens: env_list("RIDGELINE_ADMIN_TOKENS"),
        session_secret: env_string_or("RIDGELINE_SESSION_SECRET", ""),
        session_ttl: Duration::from_secs(env_u64(
            "RIDGELINE_SESSION_TTL_SECS",
            defaults.session_ttl.as_secs(),
        )),
        revalidate_secret: env_string("RIDGELINE_REVALIDATE_SECRET"),
        enable_debug_dashboard: env_bool("RIDGELINE_ENABLE_DEBUG_DASHBOARD", false),
        page_cache_ttl: Duration::from_secs(env_u64(
            "RIDGELINE_PAGE_CACHE_TTL_SECS",
            defaults.page_cache_ttl.as_secs(),
        )),
        page_cache_max_entries: env_usize(
            "RIDGELINE_PAGE_CACHE_MAX_ENTRIES",
            defaults.page_cache_max_entries,
        ),
        max_body_bytes: env_usize("RIDGELINE_MAX_BODY_BYTES", defaults.max_body_bytes),
        max_upload_bytes: env_usize("RIDGELINE_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
        upload,
        image_hosts,
        contact_rate_limit: RateLimitConfig {
            capacity: env_f64(
                "RIDGELINE_CONTACT_RATE_LIMIT_CAPACITY",
                defaults.contact_rate_limit.capacity,
            ),
            refill_per_sec: env_f64(
                "RIDGELINE_CONTACT_RATE_LIMIT_REFILL_PER_SEC",
                defaults.contact_rate_limit.refill_per_sec,
            ),
        },
        login_rate_limit: RateLimitConfig {
            capacity: env_f64(
                "RIDGELINE_LOGIN_RATE_LIMIT_CAPACITY",
                defaults.login_rate_limit.capacity,
            ),
            refill_per_sec: env_f64(
                "RIDGELINE_LOGIN_RATE_LIMIT_REFILL_PER_SEC",
                defaults.login_rate_limit.refill_per_sec,
            ),
        },
        trust_proxy: env_bool("RIDGELINE_TRUST_PROXY", defaults.trust_proxy),
        redis_url: env_string("RIDGELINE_REDIS_URL"),
        redis_prefix: env_string_or("RIDGELINE_REDIS_PREFIX", &defaults.redis_prefix),
        redis_timeout_ms: env_u64("RIDGELINE_REDIS_TIMEOUT_MS", defaults.redis_timeout_ms),
        enable_response_compression: env_bool(
            "RIDGELINE_ENABLE_RESPONSE_COMPRESSION",
            defaults.enable_response_compression,
        ),
        compression_min_bytes: env_usize(
            "RIDGELINE_COMPRESSION_MIN_BYTES",
            defaults.compression_min_bytes,
        ),
    })
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                warn!("signal handlers unavailable, waiting for ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_json = env_bool("RIDGELINE_LOG_JSON", true);
    if env_bool("RIDGELINE_OTEL_ENABLED", false) {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .build()
            .map_err(|e| format!("otlp exporter: {e}"))?;
        let tracer = opentelemetry_sdk::trace::TracerProvider::builder()
            .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
            .build()
            .tracer("ridgeline-server");
        if log_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();
        }
    } else if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing()?;

    let config = config_from_env()?;
    validate_startup_config(&config)?;
    let bind_addr = config.bind_addr.clone();
    let drain_ms = env_u64("RIDGELINE_SHUTDOWN_DRAIN_MS", 2_000);

    let state = AppState::from_config(config)?;
    let app = build_router(state.clone());

    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {bind_addr}: {e}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!("ridgeline-server listening on {bind_addr}");

    let ready = state.ready.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        wait_for_shutdown_signal().await;
        // Fail readiness first so the load balancer stops routing here.
        ready.store(false, Ordering::Relaxed);
        info!(drain_ms, "shutdown requested, draining");
        tokio::time::sleep(Duration::from_millis(drain_ms)).await;
    })
    .await
    .map_err(|e| format!("server failed: {e}"))
}
