//! Localized public pages, served through the rendered-page cache.

use crate::cache::CachedPage;
use crate::http::handlers_utilities::{
    client_ip, html_response, if_none_match, maybe_compress_response, no_store, put_cache_headers,
    redirect_see_other, RequestId,
};
use crate::render::pages::{
    activities_page, activity_page, contact_page, home_page, not_found_page, text_page,
};
use crate::render::{ContactFormView, SiteChrome};
use crate::telemetry::metrics::RequestMetrics;
use crate::AppState;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form};
use bytes::Bytes;
use maud::Markup;
use ridgeline_api::{map_error, ApiError, InquirySubmission};
use ridgeline_model::{ui_labels, Locale, PageKind, SettingsSection, Slug};
use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use tracing::{debug, error, info, warn};

const RATE_LIMITED_MESSAGE: &str = "Too many messages from your connection. Please try again later.";
const STORAGE_FAILED_MESSAGE: &str = "Your message could not be saved. Please try again later.";

/// A rendered page and the cache tags it depends on.
struct Rendered {
    status: StatusCode,
    html: String,
    tags: Vec<String>,
}

impl Rendered {
    fn ok(markup: Markup, tags: Vec<String>) -> Self {
        Self {
            status: StatusCode::OK,
            html: markup.into_string(),
            tags,
        }
    }

    fn not_found(markup: Markup) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            html: markup.into_string(),
            tags: Vec::new(),
        }
    }
}

fn page_tags(locale: &Locale, extra: &[String]) -> Vec<String> {
    let mut tags = vec![format!("locale:{locale}"), "settings".to_string()];
    tags.extend(extra.iter().cloned());
    tags
}

/// Tags for a CMS page render. The default locale is tagged too because a
/// missing translation is served from it.
fn cms_page_tags(locale: &Locale, default: &Locale, kind: PageKind, extra: &[String]) -> Vec<String> {
    let mut tags = page_tags(locale, &[kind.cache_tag()]);
    if locale != default {
        tags.push(format!("locale:{default}"));
    }
    tags.extend(extra.iter().cloned());
    tags
}

pub(crate) async fn load_chrome(
    state: &AppState,
    locale: &Locale,
    path_suffix: &str,
) -> Result<SiteChrome, ApiError> {
    let (site, contact, social) = state
        .with_repo(|r| {
            Ok((
                r.settings(SettingsSection::Site)?,
                r.settings(SettingsSection::Contact)?,
                r.settings(SettingsSection::Social)?,
            ))
        })
        .await?;
    let cfg = &state.config;
    Ok(SiteChrome {
        locale: locale.clone(),
        default_locale: cfg.default_locale().clone(),
        supported: cfg.locales.supported().to_vec(),
        site_name: cfg.site_name.clone(),
        site,
        contact,
        social,
        hosts: cfg.image_hosts.clone(),
        path_suffix: path_suffix.to_string(),
    })
}

/// HTML response with etag, compression and `x-cache`; 304 when the client
/// already holds this version.
fn page_response(
    state: &AppState,
    headers: &HeaderMap,
    status: StatusCode,
    body: Bytes,
    etag: Option<&str>,
    x_cache: &'static str,
) -> Response {
    if let Some(etag) = etag {
        if if_none_match(headers).as_deref() == Some(etag) {
            let mut resp = StatusCode::NOT_MODIFIED.into_response();
            put_cache_headers(resp.headers_mut(), state.config.page_cache_ttl, etag);
            resp.headers_mut()
                .insert("x-cache", HeaderValue::from_static(x_cache));
            return resp;
        }
    }
    let (bytes, encoding) = match maybe_compress_response(headers, state, body.to_vec()) {
        Ok(out) => out,
        Err(e) => {
            warn!("compression skipped: {e}");
            (body.to_vec(), None)
        }
    };
    let mut resp = html_response(status, bytes);
    let h = resp.headers_mut();
    match etag {
        Some(etag) => put_cache_headers(h, state.config.page_cache_ttl, etag),
        None => no_store(h),
    }
    if let Some(encoding) = encoding {
        h.insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding));
    }
    h.insert(header::VARY, HeaderValue::from_static("accept-encoding"));
    h.insert("x-cache", HeaderValue::from_static(x_cache));
    resp
}

fn public_error_response(err: &ApiError, request_id: &str) -> Response {
    error!(request_id, code = err.code.as_str(), "page render failed: {}", err.message);
    let status = StatusCode::from_u16(map_error(err).status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let status = if status.is_client_error() { StatusCode::INTERNAL_SERVER_ERROR } else { status };
    html_response(
        status,
        format!("<!DOCTYPE html><title>Error</title><h1>Something went wrong</h1><p>Reference: {request_id}</p>"),
    )
}

/// Serve `path` from the page cache or render it. Only 200 responses of
/// cacheable requests are stored.
async fn serve_page(
    state: &AppState,
    headers: &HeaderMap,
    request_id: &str,
    path: &str,
    cacheable: bool,
    render: impl Future<Output = Result<Rendered, ApiError>>,
) -> Response {
    let (hit, generation) = {
        let mut cache = state.page_cache.lock().await;
        let hit = if cacheable { cache.get(path) } else { None };
        (hit, cache.generation())
    };
    if let Some(page) = hit {
        return page_response(state, headers, StatusCode::OK, page.body, Some(&page.etag), "hit");
    }
    let rendered = match render.await {
        Ok(r) => r,
        Err(e) => return public_error_response(&e, request_id),
    };
    let body = Bytes::from(rendered.html);
    if cacheable && rendered.status == StatusCode::OK {
        let page = CachedPage::new(body.clone(), rendered.tags);
        let etag = page.etag.clone();
        let stored = state
            .page_cache
            .lock()
            .await
            .insert_if_current(path, page, generation);
        if !stored {
            debug!(path, "page invalidated while rendering, not cached");
        }
        return page_response(state, headers, StatusCode::OK, body, Some(&etag), "miss");
    }
    page_response(state, headers, rendered.status, body, None, "bypass")
}

async fn not_found_for(state: &AppState, locale: &Locale) -> Result<Rendered, ApiError> {
    let chrome = load_chrome(state, locale, "").await?;
    Ok(Rendered::not_found(not_found_page(&chrome)))
}

async fn unknown_locale(state: &AppState, headers: &HeaderMap, request_id: &str) -> Response {
    let locale = state.config.default_locale().clone();
    serve_page(state, headers, request_id, "", false, not_found_for(state, &locale)).await
}

pub(crate) async fn root_redirect(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let accept = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());
    let locale = state.config.locales.negotiate(accept);
    let mut resp = StatusCode::FOUND.into_response();
    if let Ok(v) = HeaderValue::from_str(&format!("/{locale}")) {
        resp.headers_mut().insert(header::LOCATION, v);
    }
    resp.headers_mut()
        .insert(header::VARY, HeaderValue::from_static("accept-language"));
    resp
}

pub(crate) async fn fallback_handler(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
) -> Response {
    unknown_locale(&state, &headers, &request_id).await
}

pub(crate) async fn home_handler(
    State(state): State<AppState>,
    Path(raw_locale): Path<String>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
) -> Response {
    let Some(locale) = state.config.locales.resolve(&raw_locale) else {
        return unknown_locale(&state, &headers, &request_id).await;
    };
    let path = format!("/{locale}");
    let render = async {
        let chrome = load_chrome(&state, &locale, "").await?;
        let (l, default) = (locale.clone(), state.config.default_locale().clone());
        let (page, featured) = state
            .with_repo(move |r| {
                Ok((
                    r.page_or_default(PageKind::Home, &l, &default)?,
                    r.featured_activities()?,
                ))
            })
            .await?;
        let tags = cms_page_tags(
            &locale,
            state.config.default_locale(),
            PageKind::Home,
            &["activities".to_string()],
        );
        Ok::<_, ApiError>(Rendered::ok(home_page(&chrome, page.as_ref(), &featured), tags))
    };
    serve_page(&state, &headers, &request_id, &path, true, render).await
}

pub(crate) async fn activities_handler(
    State(state): State<AppState>,
    Path(raw_locale): Path<String>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
) -> Response {
    let Some(locale) = state.config.locales.resolve(&raw_locale) else {
        return unknown_locale(&state, &headers, &request_id).await;
    };
    let path = format!("/{locale}/activities");
    let render = async {
        let chrome = load_chrome(&state, &locale, "/activities").await?;
        let activities = state.with_repo(|r| r.published_activities()).await?;
        let tags = page_tags(&locale, &["activities".to_string()]);
        Ok::<_, ApiError>(Rendered::ok(activities_page(&chrome, &activities), tags))
    };
    serve_page(&state, &headers, &request_id, &path, true, render).await
}

pub(crate) async fn activity_handler(
    State(state): State<AppState>,
    Path((raw_locale, raw_slug)): Path<(String, String)>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
) -> Response {
    let Some(locale) = state.config.locales.resolve(&raw_locale) else {
        return unknown_locale(&state, &headers, &request_id).await;
    };
    let Ok(slug) = Slug::parse(&raw_slug) else {
        return serve_page(&state, &headers, &request_id, "", false, not_found_for(&state, &locale)).await;
    };
    let path = format!("/{locale}/activities/{slug}");
    let render = async {
        let chrome = load_chrome(&state, &locale, &format!("/activities/{slug}")).await?;
        let s = slug.clone();
        let activity = state.with_repo(move |r| r.activity(&s)).await?;
        match activity.filter(|a| a.published) {
            Some(activity) => {
                let tags = page_tags(&locale, &activity.cache_tags());
                Ok::<_, ApiError>(Rendered::ok(activity_page(&chrome, &activity), tags))
            }
            None => Ok::<_, ApiError>(Rendered::not_found(not_found_page(&chrome))),
        }
    };
    serve_page(&state, &headers, &request_id, &path, true, render).await
}

pub(crate) async fn about_handler(
    State(state): State<AppState>,
    Path(raw_locale): Path<String>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
) -> Response {
    let Some(locale) = state.config.locales.resolve(&raw_locale) else {
        return unknown_locale(&state, &headers, &request_id).await;
    };
    let path = format!("/{locale}/about");
    let render = async {
        let chrome = load_chrome(&state, &locale, "/about").await?;
        let (l, default) = (locale.clone(), state.config.default_locale().clone());
        let page = state
            .with_repo(move |r| r.page_or_default(PageKind::About, &l, &default))
            .await?;
        let tags = cms_page_tags(&locale, state.config.default_locale(), PageKind::About, &[]);
        let fallback = ui_labels(&locale).nav_about;
        Ok::<_, ApiError>(Rendered::ok(text_page(&chrome, page.as_ref(), fallback), tags))
    };
    serve_page(&state, &headers, &request_id, &path, true, render).await
}

async fn render_contact(
    state: &AppState,
    locale: &Locale,
    form: &ContactFormView,
    status: StatusCode,
) -> Result<Rendered, ApiError> {
    let chrome = load_chrome(state, locale, "/contact").await?;
    let (l, default) = (locale.clone(), state.config.default_locale().clone());
    let (page, activities) = state
        .with_repo(move |r| {
            Ok((
                r.page_or_default(PageKind::Contact, &l, &default)?,
                r.published_activities()?,
            ))
        })
        .await?;
    let tags = cms_page_tags(
        locale,
        state.config.default_locale(),
        PageKind::Contact,
        &["activities".to_string()],
    );
    Ok(Rendered {
        status,
        html: contact_page(&chrome, page.as_ref(), &activities, form).into_string(),
        tags,
    })
}

pub(crate) async fn contact_handler(
    State(state): State<AppState>,
    Path(raw_locale): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
) -> Response {
    let Some(locale) = state.config.locales.resolve(&raw_locale) else {
        return unknown_locale(&state, &headers, &request_id).await;
    };
    let path = format!("/{locale}/contact");
    // Prefilled or confirmation views depend on the query string.
    let cacheable = query.is_empty();
    let form = ContactFormView {
        values: InquirySubmission {
            activity: query.get("activity").filter(|a| !a.is_empty()).cloned(),
            ..InquirySubmission::default()
        },
        error: None,
        sent: query.get("sent").is_some_and(|v| v == "1"),
    };
    let render = render_contact(&state, &locale, &form, StatusCode::OK);
    serve_page(&state, &headers, &request_id, &path, cacheable, render).await
}

pub(crate) async fn contact_submit_handler(
    State(state): State<AppState>,
    Path(raw_locale): Path<String>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Form(submission): Form<InquirySubmission>,
) -> Response {
    let Some(locale) = state.config.locales.resolve(&raw_locale) else {
        return unknown_locale(&state, &headers, &request_id).await;
    };
    let ip = client_ip(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        state.config.trust_proxy,
    );
    if !state
        .contact_limiter
        .allow(&ip, &state.config.contact_rate_limit)
        .await
    {
        RequestMetrics::bump(&state.metrics.rate_limited_total);
        info!(client = %ip, "contact form rate limited");
        let form = ContactFormView {
            values: submission,
            error: Some(RATE_LIMITED_MESSAGE.to_string()),
            sent: false,
        };
        let render = render_contact(&state, &locale, &form, StatusCode::TOO_MANY_REQUESTS);
        return serve_page(&state, &headers, &request_id, "", false, render).await;
    }
    let sent_location = format!("/{locale}/contact?sent=1");
    if submission.is_spam() {
        RequestMetrics::bump(&state.metrics.spam_rejected_total);
        info!(client = %ip, "contact form honeypot triggered");
        return redirect_see_other(&sent_location);
    }
    let inquiry = match submission.clone().into_inquiry(locale.clone(), chrono::Utc::now()) {
        Ok(inquiry) => inquiry,
        Err(e) => {
            let form = ContactFormView {
                values: submission,
                error: Some(e.message),
                sent: false,
            };
            let render = render_contact(&state, &locale, &form, StatusCode::UNPROCESSABLE_ENTITY);
            return serve_page(&state, &headers, &request_id, "", false, render).await;
        }
    };
    let id = inquiry.id.clone();
    match state.with_repo(move |r| r.save_inquiry(&inquiry)).await {
        Ok(outcome) => {
            RequestMetrics::bump(&state.metrics.inquiries_total);
            info!(inquiry_id = %id, degraded = outcome.degraded, "inquiry stored");
            redirect_see_other(&sent_location)
        }
        Err(e) => {
            error!(request_id, "storing inquiry failed: {e}");
            let form = ContactFormView {
                values: submission,
                error: Some(STORAGE_FAILED_MESSAGE.to_string()),
                sent: false,
            };
            let render = render_contact(&state, &locale, &form, StatusCode::SERVICE_UNAVAILABLE);
            serve_page(&state, &headers, &request_id, "", false, render).await
        }
    }
}
