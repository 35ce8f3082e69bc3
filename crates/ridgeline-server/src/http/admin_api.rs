// SPDX-License-Identifier: Apache-2.0

//! Admin CRUD over activities, pages, settings and inquiries, plus store
//! sync and the JSON debug snapshot. Every mutation invalidates the cache
//! tags its public pages carry.

use crate::debug::collect_snapshot;
use crate::http::handlers_utilities::{error_response, json_response, RequestId};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Extension;
use bytes::Bytes;
use ridgeline_api::{
    parse_list_params, ActivityUpsert, ApiError, MutationResponse, PageUpsert, SettingsUpdate,
    StorageStatus, SyncDirection, SyncRequest, SyncResponse,
};
use ridgeline_model::{Activity, Collection, Locale, PageKind, SettingsSection, Slug};
use ridgeline_store::{drift_report, sync_stores, ContentStore, SyncOptions, WriteOutcome};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};

type ApiResult = Result<Response, ApiError>;

fn respond(request_id: &str, result: ApiResult) -> Response {
    result.unwrap_or_else(|e| error_response(e, request_id))
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(ApiError::validation_failed("body", "request body is empty"));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::validation_failed("body", e.to_string()))
}

fn parse_slug(raw: &str) -> Result<Slug, ApiError> {
    Slug::parse(raw).map_err(|_| ApiError::invalid_param("slug", raw))
}

fn parse_kind(raw: &str) -> Result<PageKind, ApiError> {
    PageKind::parse(raw).map_err(|_| ApiError::invalid_param("kind", raw))
}

fn parse_section(raw: &str) -> Result<SettingsSection, ApiError> {
    SettingsSection::parse(raw).map_err(|_| ApiError::invalid_param("section", raw))
}

fn supported_locale(state: &AppState, raw: &str) -> Result<Locale, ApiError> {
    state
        .config
        .locales
        .resolve(raw)
        .ok_or_else(|| ApiError::invalid_param("locale", raw))
}

fn parse_collections(raw: &[String]) -> Result<Vec<Collection>, ApiError> {
    if raw.is_empty() {
        return Ok(Collection::ALL.to_vec());
    }
    raw.iter()
        .map(|c| Collection::parse(c).map_err(|_| ApiError::invalid_param("collections", c)))
        .collect()
}

fn storage_status(what: &str, id: &str, outcome: WriteOutcome) -> StorageStatus {
    if outcome.degraded {
        warn!(what, id, failures = ?outcome.failures, "write reached one backend only");
    }
    StorageStatus::from(outcome)
}

async fn invalidate_activity(state: &AppState, activity: &Activity) {
    let paths = activity.public_paths(state.config.locales.supported());
    let removed = state.invalidate(&paths, &activity.cache_tags()).await;
    info!(slug = %activity.slug, removed, "activity pages invalidated");
}

pub(crate) async fn list_activities(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    let result = async {
        let params = parse_list_params(&query)?;
        let activities = state.with_repo(|r| r.activities()).await?;
        let filtered: Vec<Activity> = activities
            .into_iter()
            .filter(|a| params.published.map_or(true, |p| a.published == p))
            .filter(|a| {
                params
                    .locale
                    .as_ref()
                    .map_or(true, |l| a.translations.contains_key(l))
            })
            .collect();
        Ok(json_response(StatusCode::OK, &params.paginate(filtered)))
    };
    respond(&rid, result.await)
}

pub(crate) async fn create_activity(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    body: Bytes,
) -> Response {
    let result = async {
        let upsert: ActivityUpsert = parse_json(&body)?;
        let activity =
            upsert.into_activity(None, state.config.default_locale(), chrono::Utc::now())?;
        let outcome = {
            let _creating = state.create_lock.lock().await;
            let saved = activity.clone();
            state
                .with_repo(move |r| {
                    if r.activity(&saved.slug)?.is_some() {
                        return Ok(None);
                    }
                    r.save_activity(&saved).map(Some)
                })
                .await?
        };
        let Some(outcome) = outcome else {
            return Err(ApiError::conflict(format!(
                "activity `{}` already exists",
                activity.slug
            )));
        };
        invalidate_activity(&state, &activity).await;
        let storage = storage_status("activity", activity.slug.as_str(), outcome);
        Ok(json_response(
            StatusCode::CREATED,
            &MutationResponse { data: activity, storage },
        ))
    };
    respond(&rid, result.await)
}

pub(crate) async fn get_activity(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Path(raw_slug): Path<String>,
) -> Response {
    let result = async {
        let slug = parse_slug(&raw_slug)?;
        let activity = state
            .with_repo(move |r| r.activity(&slug))
            .await?
            .ok_or_else(|| ApiError::not_found("activity"))?;
        Ok(json_response(StatusCode::OK, &activity))
    };
    respond(&rid, result.await)
}

pub(crate) async fn put_activity(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Path(raw_slug): Path<String>,
    body: Bytes,
) -> Response {
    let result = async {
        let slug = parse_slug(&raw_slug)?;
        let upsert: ActivityUpsert = parse_json(&body)?;
        let activity =
            upsert.into_activity(Some(&slug), state.config.default_locale(), chrono::Utc::now())?;
        let saved = activity.clone();
        let outcome = state.with_repo(move |r| r.save_activity(&saved)).await?;
        invalidate_activity(&state, &activity).await;
        let storage = storage_status("activity", slug.as_str(), outcome);
        Ok(json_response(
            StatusCode::OK,
            &MutationResponse { data: activity, storage },
        ))
    };
    respond(&rid, result.await)
}

pub(crate) async fn delete_activity(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Path(raw_slug): Path<String>,
) -> Response {
    let result = async {
        let slug = parse_slug(&raw_slug)?;
        let s = slug.clone();
        let existing = state
            .with_repo(move |r| r.activity(&s))
            .await?
            .ok_or_else(|| ApiError::not_found("activity"))?;
        let s = slug.clone();
        if !state.with_repo(move |r| r.delete_activity(&s)).await? {
            return Err(ApiError::not_found("activity"));
        }
        invalidate_activity(&state, &existing).await;
        Ok(json_response(StatusCode::OK, &json!({"deleted": slug.as_str()})))
    };
    respond(&rid, result.await)
}

pub(crate) async fn list_pages(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    let result = async {
        let params = parse_list_params(&query)?;
        let pages = state.with_repo(|r| r.pages()).await?;
        let filtered = pages
            .into_iter()
            .filter(|p| params.locale.as_ref().map_or(true, |l| &p.locale == l))
            .collect();
        Ok(json_response(StatusCode::OK, &params.paginate(filtered)))
    };
    respond(&rid, result.await)
}

pub(crate) async fn get_page(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Path((raw_kind, raw_locale)): Path<(String, String)>,
) -> Response {
    let result = async {
        let kind = parse_kind(&raw_kind)?;
        let locale = supported_locale(&state, &raw_locale)?;
        let page = state
            .with_repo(move |r| r.page(kind, &locale))
            .await?
            .ok_or_else(|| ApiError::not_found("page"))?;
        Ok(json_response(StatusCode::OK, &page))
    };
    respond(&rid, result.await)
}

pub(crate) async fn put_page(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Path((raw_kind, raw_locale)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let result = async {
        let kind = parse_kind(&raw_kind)?;
        let locale = supported_locale(&state, &raw_locale)?;
        let upsert: PageUpsert = parse_json(&body)?;
        let page = upsert.into_page(kind, locale.clone(), chrono::Utc::now())?;
        let saved = page.clone();
        let outcome = state.with_repo(move |r| r.save_page(&saved)).await?;
        state
            .invalidate(&[kind.public_path(&locale)], &[kind.cache_tag()])
            .await;
        let storage = storage_status("page", &format!("{}.{locale}", kind.as_str()), outcome);
        Ok(json_response(
            StatusCode::OK,
            &MutationResponse { data: page, storage },
        ))
    };
    respond(&rid, result.await)
}

pub(crate) async fn delete_page(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Path((raw_kind, raw_locale)): Path<(String, String)>,
) -> Response {
    let result = async {
        let kind = parse_kind(&raw_kind)?;
        let locale = supported_locale(&state, &raw_locale)?;
        let l = locale.clone();
        if !state.with_repo(move |r| r.delete_page(kind, &l)).await? {
            return Err(ApiError::not_found("page"));
        }
        state
            .invalidate(&[kind.public_path(&locale)], &[kind.cache_tag()])
            .await;
        Ok(json_response(
            StatusCode::OK,
            &json!({"deleted": format!("{}.{locale}", kind.as_str())}),
        ))
    };
    respond(&rid, result.await)
}

pub(crate) async fn list_settings(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
) -> Response {
    let result = async {
        let all = state.with_repo(|r| r.all_settings()).await?;
        Ok(json_response(StatusCode::OK, &json!({"items": all})))
    };
    respond(&rid, result.await)
}

pub(crate) async fn get_settings(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Path(raw_section): Path<String>,
) -> Response {
    let result = async {
        let section = parse_section(&raw_section)?;
        let settings = state.with_repo(move |r| r.settings(section)).await?;
        Ok(json_response(StatusCode::OK, &settings))
    };
    respond(&rid, result.await)
}

pub(crate) async fn put_settings(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Path(raw_section): Path<String>,
    body: Bytes,
) -> Response {
    let result = async {
        let section = parse_section(&raw_section)?;
        let update: SettingsUpdate = parse_json(&body)?;
        let settings = update.into_settings(section, chrono::Utc::now())?;
        let saved = settings.clone();
        let outcome = state.with_repo(move |r| r.save_settings(&saved)).await?;
        // Header and footer of every page read settings.
        state.invalidate(&[], &["settings".to_string()]).await;
        let storage = storage_status("settings", section.as_str(), outcome);
        Ok(json_response(
            StatusCode::OK,
            &MutationResponse { data: settings, storage },
        ))
    };
    respond(&rid, result.await)
}

pub(crate) async fn list_inquiries(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    let result = async {
        let params = parse_list_params(&query)?;
        let inquiries = state.with_repo(|r| r.inquiries()).await?;
        let filtered = inquiries
            .into_iter()
            .filter(|i| params.locale.as_ref().map_or(true, |l| &i.locale == l))
            .collect();
        Ok(json_response(StatusCode::OK, &params.paginate(filtered)))
    };
    respond(&rid, result.await)
}

pub(crate) async fn drift_handler(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    let result = async {
        let requested: Vec<String> = query
            .get("collections")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let collections = parse_collections(&requested)?;
        let store = state.store.clone();
        let report = tokio::task::spawn_blocking(move || {
            drift_report(store.db().as_ref(), store.files().as_ref(), &collections)
        })
        .await
        .map_err(|e| ApiError::internal(format!("drift task failed: {e}")))??;
        Ok(json_response(
            StatusCode::OK,
            &json!({
                "clean": report.is_clean(),
                "drifted": report.drifted_count(),
                "report": report,
            }),
        ))
    };
    respond(&rid, result.await)
}

pub(crate) async fn sync_handler(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
    body: Bytes,
) -> Response {
    let result = async {
        let request: SyncRequest = parse_json(&body)?;
        let options = SyncOptions {
            collections: parse_collections(&request.collections)?,
            force: request.force,
            dry_run: request.dry_run,
        };
        let direction = request.direction;
        let store = state.store.clone();
        let report = tokio::task::spawn_blocking(move || {
            let (from, to): (&dyn ContentStore, &dyn ContentStore) = match direction {
                SyncDirection::DbToFiles => (store.db().as_ref(), store.files().as_ref()),
                SyncDirection::FilesToDb => (store.files().as_ref(), store.db().as_ref()),
            };
            sync_stores(from, to, &options)
        })
        .await
        .map_err(|e| ApiError::internal(format!("sync task failed: {e}")))??;
        if !request.dry_run && report.copied > 0 {
            let removed = state.page_cache.lock().await.clear();
            info!(direction = direction.as_str(), copied = report.copied, removed, "stores synced");
        }
        Ok(json_response(
            StatusCode::OK,
            &SyncResponse {
                direction,
                dry_run: request.dry_run,
                report,
            },
        ))
    };
    respond(&rid, result.await)
}

pub(crate) async fn debug_handler(
    State(state): State<AppState>,
    Extension(RequestId(rid)): Extension<RequestId>,
) -> Response {
    if !state.config.enable_debug_dashboard {
        return error_response(ApiError::not_found("debug dashboard"), &rid);
    }
    let snapshot = collect_snapshot(&state).await;
    json_response(StatusCode::OK, &snapshot)
}
