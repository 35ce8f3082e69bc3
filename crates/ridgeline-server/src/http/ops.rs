// SPDX-License-Identifier: Apache-2.0

use crate::telemetry::metrics::METRIC_PREFIX;
use crate::{AppState, CRATE_NAME};
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ridgeline_api::{openapi_v1_spec, API_VERSION};
use serde_json::json;
use std::fmt::Write as _;

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_ready().await {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready")
    }
}

pub(crate) async fn version_handler() -> Response {
    let payload = json!({
        "name": "ridgeline",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": API_VERSION,
        "build_hash": option_env!("RIDGELINE_BUILD_HASH").unwrap_or("dev"),
        "server": {
            "crate": CRATE_NAME,
            "config_schema_version": crate::config::CONFIG_SCHEMA_VERSION,
        }
    });
    let mut response = Json(payload).into_response();
    response
        .headers_mut()
        .insert("cache-control", HeaderValue::from_static("public, max-age=30"));
    response
}

pub(crate) async fn openapi_handler() -> Response {
    let mut response = Json(openapi_v1_spec()).into_response();
    response
        .headers_mut()
        .insert("cache-control", HeaderValue::from_static("public, max-age=300"));
    response
}

/// Prometheus text: request counters, page cache and dual-write health.
pub(crate) async fn metrics_handler(State(state): State<AppState>) -> Response {
    let mut body = String::with_capacity(4096);
    state.metrics.render_requests(&mut body).await;

    let cache = state.page_cache_stats().await;
    for (name, value) in [
        ("page_cache_hits_total", cache.hits),
        ("page_cache_misses_total", cache.misses),
        ("page_cache_invalidated_total", cache.invalidated),
        ("page_cache_entries", cache.entries as u64),
    ] {
        let _ = writeln!(body, "{METRIC_PREFIX}_{name} {value}");
    }

    let writes = state.store.write_report();
    let _ = writeln!(body, "# TYPE {METRIC_PREFIX}_store_writes_total counter");
    for (outcome, value) in [
        ("ok", writes.writes_ok),
        ("degraded", writes.writes_degraded),
        ("failed", writes.writes_failed),
    ] {
        let _ = writeln!(
            body,
            "{METRIC_PREFIX}_store_writes_total{{outcome=\"{outcome}\",mode=\"{}\"}} {value}",
            writes.mode.as_str()
        );
    }
    for (backend, value) in [("db", writes.db_failures), ("files", writes.file_failures)] {
        let _ = writeln!(
            body,
            "{METRIC_PREFIX}_store_backend_failures_total{{backend=\"{backend}\"}} {value}"
        );
    }
    let _ = writeln!(
        body,
        "{METRIC_PREFIX}_store_read_fallbacks_total {}",
        writes.read_fallbacks
    );
    if let Some(redis) = state.contact_limiter.redis() {
        let stats = redis.stats();
        for (name, value) in [
            ("checks", stats.checks_total),
            ("rejected", stats.rejected_total),
            ("fallbacks", stats.fallbacks_total),
        ] {
            let _ = writeln!(body, "{METRIC_PREFIX}_redis_rate_limit_{name}_total {value}");
        }
    }

    let mut response = (StatusCode::OK, body).into_response();
    response.headers_mut().insert(
        "content-type",
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    response
}
