// SPDX-License-Identifier: Apache-2.0

use crate::http::handlers_utilities::{propagated_request_id, with_request_id, RequestId};
use crate::AppState;
use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tracing::Instrument;

/// Opens the `http.request` span, hands the request id to handlers through
/// an extension and records per-route metrics.
pub(crate) async fn request_tracing_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| static_route(request.uri().path()));
    let request_id = propagated_request_id(request.headers(), &state);
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        route = %route,
        status = tracing::field::Empty,
    );
    let response = next.run(request).instrument(span.clone()).await;
    let status = response.status();
    span.record("status", status.as_u16());
    let elapsed = started.elapsed();
    if status.is_server_error() {
        tracing::warn!(parent: &span, latency_ms = elapsed.as_millis() as u64, "request failed");
    } else {
        tracing::debug!(parent: &span, latency_ms = elapsed.as_millis() as u64, "request served");
    }
    state.metrics.observe_request(&route, status, elapsed).await;
    with_request_id(response, &request_id)
}

/// Unmatched paths are bucketed so metrics labels stay bounded.
fn static_route(path: &str) -> String {
    ["/uploads", "/images", "/assets"]
        .into_iter()
        .find(|prefix| path.starts_with(prefix))
        .map_or_else(|| "unmatched".to_string(), |p| format!("{p}/*"))
}
