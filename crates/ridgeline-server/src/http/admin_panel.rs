//! Server-rendered admin panel: login, content overview, settings forms
//! and the debug dashboard.

use crate::debug::collect_snapshot;
use crate::http::handlers_utilities::{
    bool_query_flag, client_ip, html_response, no_store, redirect_see_other, RequestId,
};
use crate::middleware::admin_auth::{clear_session_cookie, is_admin, is_admin_token, session_set_cookie};
use crate::render::admin::{debug_page, login_page, overview_page, settings_form_page};
use crate::render::admin_layout;
use crate::telemetry::metrics::RequestMetrics;
use crate::AppState;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use axum::{Extension, Form};
use maud::{html, Markup};
use ridgeline_api::SettingsUpdate;
use ridgeline_model::{Settings, SettingsSection};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tracing::{error, info, warn};

const LOGIN_RATE_LIMITED: &str = "Too many sign-in attempts. Wait a minute and try again.";
const LOGIN_REJECTED: &str = "That token is not valid.";

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    token: String,
}

fn admin_page(status: StatusCode, markup: Markup) -> Response {
    let mut response = html_response(status, markup.into_string());
    no_store(response.headers_mut());
    response
}

fn admin_error_page(status: StatusCode, message: &str) -> Response {
    let content = html! {
        h1 { (status.as_u16()) }
        p class="notice error" role="alert" { (message) }
        p { a href="/admin" { "Back to overview" } }
    };
    admin_page(status, admin_layout("Error", content))
}

fn with_cookie(mut response: Response, cookie: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

pub(crate) async fn login_form_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if is_admin(&headers, &state) {
        return redirect_see_other("/admin");
    }
    admin_page(StatusCode::OK, login_page(None))
}

pub(crate) async fn login_handler(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let ip = client_ip(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        state.config.trust_proxy,
    );
    if !state
        .login_limiter
        .allow(&ip, &state.config.login_rate_limit)
        .await
    {
        RequestMetrics::bump(&state.metrics.rate_limited_total);
        warn!(client = %ip, "admin login rate limited");
        return admin_page(StatusCode::TOO_MANY_REQUESTS, login_page(Some(LOGIN_RATE_LIMITED)));
    }
    let token = form.token.trim();
    if token.is_empty() || !is_admin_token(&state, token) {
        info!(client = %ip, request_id, "admin login rejected");
        return admin_page(StatusCode::UNAUTHORIZED, login_page(Some(LOGIN_REJECTED)));
    }
    let Some(cookie) = session_set_cookie(
        &state.config.session_secret,
        state.config.session_ttl,
        chrono::Utc::now().timestamp(),
    ) else {
        error!(request_id, "session cookie could not be signed");
        return admin_error_page(StatusCode::INTERNAL_SERVER_ERROR, "Session could not be created.");
    };
    info!(client = %ip, "admin signed in");
    with_cookie(redirect_see_other("/admin"), &cookie)
}

pub(crate) async fn logout_handler() -> Response {
    with_cookie(redirect_see_other("/admin/login"), &clear_session_cookie())
}

pub(crate) async fn overview_handler(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Response {
    let loaded = state
        .with_repo(|r| Ok((r.activities()?, r.pages()?, r.inquiries()?.len())))
        .await;
    match loaded {
        Ok((activities, pages, inquiry_count)) => admin_page(
            StatusCode::OK,
            overview_page(
                &activities,
                &pages,
                state.config.locales.supported(),
                state.config.default_locale(),
                inquiry_count,
            ),
        ),
        Err(e) => {
            error!(request_id, "admin overview failed: {e}");
            admin_error_page(StatusCode::SERVICE_UNAVAILABLE, "Content storage is unavailable.")
        }
    }
}

pub(crate) async fn settings_form_handler(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path(raw_section): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    let Ok(section) = SettingsSection::parse(&raw_section) else {
        return admin_error_page(StatusCode::NOT_FOUND, "Unknown settings section.");
    };
    match state.with_repo(move |r| r.settings(section)).await {
        Ok(settings) => admin_page(
            StatusCode::OK,
            settings_form_page(&settings, bool_query_flag(&query, "saved"), None),
        ),
        Err(e) => {
            error!(request_id, section = section.as_str(), "loading settings failed: {e}");
            admin_error_page(StatusCode::SERVICE_UNAVAILABLE, "Content storage is unavailable.")
        }
    }
}

pub(crate) async fn settings_save_handler(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path(raw_section): Path<String>,
    Form(form): Form<BTreeMap<String, String>>,
) -> Response {
    let Ok(section) = SettingsSection::parse(&raw_section) else {
        return admin_error_page(StatusCode::NOT_FOUND, "Unknown settings section.");
    };
    let update = SettingsUpdate::from_form(section, &form);
    // Echo what was typed when the form has to be shown again.
    let submitted = Settings {
        section,
        values: update.values.clone(),
        updated_at: chrono::Utc::now(),
    };
    let settings = match update.into_settings(section, chrono::Utc::now()) {
        Ok(settings) => settings,
        Err(e) => {
            return admin_page(
                StatusCode::UNPROCESSABLE_ENTITY,
                settings_form_page(&submitted, false, Some(&e.message)),
            )
        }
    };
    match state.with_repo(move |r| r.save_settings(&settings)).await {
        Ok(outcome) => {
            let removed = state.invalidate(&[], &["settings".to_string()]).await;
            info!(
                section = section.as_str(),
                degraded = outcome.degraded,
                removed,
                "settings saved from admin panel"
            );
            redirect_see_other(&format!("/admin/settings/{}?saved=1", section.as_str()))
        }
        Err(e) => {
            error!(request_id, section = section.as_str(), "saving settings failed: {e}");
            admin_page(
                StatusCode::SERVICE_UNAVAILABLE,
                settings_form_page(&submitted, false, Some("Saving failed: storage unavailable.")),
            )
        }
    }
}

pub(crate) async fn debug_dashboard_handler(State(state): State<AppState>) -> Response {
    if !state.config.enable_debug_dashboard {
        return admin_error_page(StatusCode::NOT_FOUND, "The debug dashboard is disabled.");
    }
    let snapshot = collect_snapshot(&state).await;
    admin_page(StatusCode::OK, debug_page(&snapshot))
}
