//! On-demand cache revalidation, called by the admin tooling after content
//! edits made outside the admin API.

use crate::http::admin_api::parse_json;
use crate::http::handlers_utilities::{error_response, json_response, normalized_header_value, RequestId};
use crate::middleware::admin_auth::{is_admin, token_eq};
use crate::telemetry::metrics::RequestMetrics;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Extension;
use bytes::Bytes;
use ridgeline_api::{ApiError, RevalidateRequest, RevalidateResponse};
use std::collections::BTreeMap;
use tracing::info;

const REVALIDATE_SECRET_HEADER: &str = "x-revalidate-secret";
const MAX_TARGETS: usize = 256;

fn authorized(headers: &HeaderMap, state: &AppState) -> bool {
    let by_secret = match (
        state.config.revalidate_secret.as_deref(),
        normalized_header_value(headers, REVALIDATE_SECRET_HEADER, 256),
    ) {
        (Some(expected), Some(given)) => token_eq(expected, &given),
        _ => false,
    };
    by_secret || is_admin(headers, state)
}

/// `/es/about/` and `es/about` both address `/es/about`.
fn normalize_target_path(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    let path = trimmed.split(['?', '#']).next().unwrap_or_default();
    if path.is_empty() || path.contains("..") || path.chars().any(char::is_whitespace) {
        return Err(ApiError::invalid_param("path", raw));
    }
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        return Ok("/".to_string());
    }
    Ok(if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    })
}

fn revalidate_targets(
    query: &BTreeMap<String, String>,
    body: &Bytes,
) -> Result<RevalidateRequest, ApiError> {
    let mut request = if body.iter().all(u8::is_ascii_whitespace) {
        RevalidateRequest::default()
    } else {
        parse_json::<RevalidateRequest>(body)?
    };
    if let Some(path) = query.get("path") {
        request.paths.push(path.clone());
    }
    if let Some(tag) = query.get("tag") {
        request.tags.push(tag.clone());
    }
    if request.is_empty() {
        return Err(ApiError::validation_failed(
            "body",
            "give at least one path or tag to revalidate",
        ));
    }
    if request.paths.len() + request.tags.len() > MAX_TARGETS {
        return Err(ApiError::validation_failed(
            "body",
            format!("at most {MAX_TARGETS} paths and tags per request"),
        ));
    }
    request.paths = request
        .paths
        .iter()
        .map(|p| normalize_target_path(p))
        .collect::<Result<_, _>>()?;
    request.tags = request
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    Ok(request)
}

/// `POST /api/revalidate` with a JSON body `{paths, tags}` or `?path=`/`?tag=`.
pub(crate) async fn revalidate_handler(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> Response {
    if !authorized(&headers, &state) {
        return error_response(ApiError::unauthorized(), &rid);
    }
    let request = match revalidate_targets(&query, &body) {
        Ok(request) => request,
        Err(e) => return error_response(e, &rid),
    };
    let removed = state.invalidate(&request.paths, &request.tags).await;
    RequestMetrics::bump(&state.metrics.revalidations_total);
    info!(
        paths = ?request.paths,
        tags = ?request.tags,
        removed,
        "cache revalidated"
    );
    json_response(
        StatusCode::OK,
        &RevalidateResponse {
            revalidated: true,
            removed,
            paths: request.paths,
            tags: request.tags,
            now: chrono::Utc::now(),
        },
    )
}

/// `POST /api/revalidate/all` drops every cached page.
pub(crate) async fn revalidate_all_handler(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers, &state) {
        return error_response(ApiError::unauthorized(), &rid);
    }
    let removed = state.page_cache.lock().await.clear();
    RequestMetrics::bump(&state.metrics.revalidations_total);
    info!(removed, "page cache cleared");
    json_response(
        StatusCode::OK,
        &RevalidateResponse {
            revalidated: true,
            removed,
            paths: Vec::new(),
            tags: Vec::new(),
            now: chrono::Utc::now(),
        },
    )
}
