// SPDX-License-Identifier: Apache-2.0

use crate::http::handlers_utilities::{error_response, json_response, RequestId};
use crate::media::UploadRequest;
use crate::telemetry::metrics::RequestMetrics;
use crate::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Extension;
use ridgeline_api::{ApiError, ApiErrorCode, UploadResponse};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};

fn multipart_error(e: &MultipartError, max_upload_bytes: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(
            ApiErrorCode::PayloadTooLarge,
            format!("upload exceeds {max_upload_bytes} bytes"),
            json!({"max_bytes": max_upload_bytes}),
            "req-unknown",
        )
    } else {
        ApiError::validation_failed("body", e.body_text())
    }
}

async fn read_upload(mut multipart: Multipart, max_upload_bytes: usize) -> Result<UploadRequest, ApiError> {
    let mut file = None;
    let mut folder = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, max_upload_bytes))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().map(ToString::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(&e, max_upload_bytes))?;
                file = Some((file_name, content_type, bytes));
            }
            Some("folder") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(&e, max_upload_bytes))?;
                let text = text.trim();
                if !text.is_empty() {
                    folder = Some(text.to_string());
                }
            }
            _ => {}
        }
    }
    let (file_name, content_type, bytes) = file
        .ok_or_else(|| ApiError::validation_failed("file", "multipart field `file` is required"))?;
    Ok(UploadRequest {
        file_name,
        content_type,
        folder,
        bytes,
    })
}

/// `POST /api/admin/upload`: multipart `file` plus optional `folder`.
pub(crate) async fn upload_handler(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    multipart: Multipart,
) -> Response {
    let max = state.config.max_upload_bytes;
    let request = match read_upload(multipart, max).await {
        Ok(request) => request,
        Err(e) => {
            RequestMetrics::bump(&state.metrics.upload_failures_total);
            return error_response(e, &rid);
        }
    };
    let file_name = request.file_name.clone();
    match state.media.upload(request).await {
        Ok(stored) => {
            RequestMetrics::bump(&state.metrics.uploads_total);
            info!(
                backend = stored.backend,
                path = %stored.path,
                bytes = stored.bytes,
                "image uploaded"
            );
            json_response(
                StatusCode::CREATED,
                &UploadResponse {
                    url: stored.url,
                    path: stored.path,
                    backend: stored.backend.to_string(),
                    bytes: stored.bytes,
                    content_type: stored.content_type,
                },
            )
        }
        Err(e) => {
            RequestMetrics::bump(&state.metrics.upload_failures_total);
            warn!(
                backend = state.media.backend_name(),
                file_name,
                error = %e,
                "image upload failed"
            );
            error_response(ApiError::from(e), &rid)
        }
    }
}

/// `DELETE /api/admin/upload?path=<handle>`.
pub(crate) async fn delete_upload_handler(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    let Some(path) = query.get("path").map(|p| p.trim()).filter(|p| !p.is_empty()) else {
        return error_response(
            ApiError::validation_failed("path", "query parameter `path` is required"),
            &rid,
        );
    };
    match state.media.delete(path).await {
        Ok(true) => {
            info!(backend = state.media.backend_name(), path, "image deleted");
            json_response(StatusCode::OK, &json!({"deleted": path}))
        }
        Ok(false) => error_response(ApiError::not_found("upload"), &rid),
        Err(e) => error_response(ApiError::from(e), &rid),
    }
}
