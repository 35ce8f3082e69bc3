use crate::http::handlers_utilities::{
    bearer_token, cookie_value, error_response, normalized_api_key, redirect_see_other, RequestId,
};
use crate::{AppState, SESSION_COOKIE};
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use ridgeline_api::ApiError;
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

fn session_mac(secret: &str, expires_at: i64) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(SESSION_COOKIE.as_bytes());
    mac.update(b":");
    mac.update(expires_at.to_string().as_bytes());
    Some(mac)
}

/// Cookie value `<expires_unix>.<hex hmac>`.
#[must_use]
pub(crate) fn session_token(secret: &str, expires_at: i64) -> Option<String> {
    let mac = session_mac(secret, expires_at)?;
    Some(format!(
        "{expires_at}.{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[must_use]
pub(crate) fn verify_session_token(secret: &str, token: &str, now_unix: i64) -> bool {
    let Some((expires, sig)) = token.split_once('.') else {
        return false;
    };
    let Ok(expires_at) = expires.parse::<i64>() else {
        return false;
    };
    if expires_at <= now_unix {
        return false;
    }
    let Ok(sig) = hex::decode(sig) else {
        return false;
    };
    session_mac(secret, expires_at).is_some_and(|mac| mac.verify_slice(&sig).is_ok())
}

pub(crate) fn session_set_cookie(secret: &str, ttl: Duration, now_unix: i64) -> Option<String> {
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2);
    let token = session_token(secret, now_unix.saturating_add(ttl_secs))?;
    Some(format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={ttl_secs}"
    ))
}

#[must_use]
pub(crate) fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

/// Compares every byte so the time taken does not depend on where tokens differ.
pub(crate) fn token_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

pub(crate) fn is_admin_token(state: &AppState, candidate: &str) -> bool {
    state
        .config
        .admin_tokens
        .iter()
        .filter(|t| !t.is_empty())
        .any(|t| token_eq(t, candidate))
}

pub(crate) fn is_admin(headers: &HeaderMap, state: &AppState) -> bool {
    if let Some(token) = bearer_token(headers).or_else(|| normalized_api_key(headers)) {
        if is_admin_token(state, &token) {
            return true;
        }
    }
    cookie_value(headers, SESSION_COOKIE).is_some_and(|value| {
        verify_session_token(
            &state.config.session_secret,
            &value,
            chrono::Utc::now().timestamp(),
        )
    })
}

pub(crate) async fn require_admin_api(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_admin(request.headers(), &state) {
        return next.run(request).await;
    }
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map_or_else(String::new, |r| r.0.clone());
    tracing::info!(path = %request.uri().path(), "admin api request rejected");
    error_response(ApiError::unauthorized(), &request_id)
}

pub(crate) async fn require_admin_html(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_admin(request.headers(), &state) {
        next.run(request).await
    } else {
        redirect_see_other("/admin/login")
    }
}
