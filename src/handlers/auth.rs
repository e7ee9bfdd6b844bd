//! # Authentication Handlers
//!
//! HTTP glue around [`AuthService`](crate::webauthn::authentication::AuthService).
//! The challenge and the username it was issued for travel between the two
//! login requests as short-lived HttpOnly cookies. Cookie values are
//! percent-encoded, since usernames may hold `;`, spaces or non-ASCII text.

use crate::error::{AppResult, AuthFailure};
use crate::session::USER_ID_KEY;
use crate::state::AppState;
use crate::webauthn::types::{
    AuthenticationResponse, ChallengeCookies, LoginOptionsRequest, CHALLENGE_COOKIE,
    USERNAME_COOKIE,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{
        header::{COOKIE, ORIGIN, SET_COOKIE},
        HeaderMap,
    },
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use cookie::{Cookie, SameSite};
use serde_json::{json, Value};
use tower_sessions::Session;

/// Start passkey login
///
/// ## Route
/// POST /api/auth/login-options
///
/// ## Response
/// Request options for `navigator.credentials.get()`, plus the
/// `auth-challenge` and `auth-username` cookies.
pub async fn login_options(
    State(state): State<AppState>,
    Json(req): Json<LoginOptionsRequest>,
) -> AppResult<impl IntoResponse> {
    let (options, challenge) = state.auth.start_authentication(&req.username).await?;

    let max_age = time::Duration::seconds(state.auth.challenge_ttl().num_seconds());
    let secure = state.auth.relying_party().origin.scheme() == "https";
    let cookies = AppendHeaders([
        (
            SET_COOKIE,
            challenge_cookie(CHALLENGE_COOKIE, challenge.challenge, max_age, secure),
        ),
        (
            SET_COOKIE,
            challenge_cookie(USERNAME_COOKIE, challenge.username, max_age, secure),
        ),
    ]);

    Ok((cookies, Json(json!(options))))
}

/// Finish passkey login
///
/// ## Route
/// POST /api/auth/login-verify
///
/// ## Responses
/// - 200 `{ "success": true, "user": { "id", "username" } }`, challenge
///   cookies cleared
/// - 400 when the challenge session is missing or expired
/// - 401 for every other rejection, with one generic message; a body that
///   does not parse as an assertion counts as a rejection too
pub async fn login_verify(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    payload: Result<Json<AuthenticationResponse>, JsonRejection>,
) -> Result<Response, AuthFailure> {
    let Json(assertion) = payload.map_err(|rejection| {
        tracing::warn!("Malformed login assertion: {}", rejection.body_text());
        AuthFailure::VerificationFailed
    })?;
    let cookies = read_challenge_cookies(&headers);
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());

    let success = state
        .auth
        .finish_authentication(&assertion, &cookies, origin, &session)
        .await?;

    let cleared = AppendHeaders([
        (SET_COOKIE, expired_cookie(CHALLENGE_COOKIE)),
        (SET_COOKIE, expired_cookie(USERNAME_COOKIE)),
    ]);
    let body = Json(json!({
        "success": true,
        "user": {
            "id": success.user_id,
            "username": success.username,
        }
    }));

    Ok((cleared, body).into_response())
}

pub async fn logout(session: Session) -> AppResult<Json<Value>> {
    session.delete().await?;

    Ok(Json(json!({
        "success": true,
        "message": "Logged out successfully"
    })))
}

pub async fn session_info(session: Session) -> AppResult<Json<Value>> {
    let user_id: Option<String> = session.get(USER_ID_KEY).await?;

    match user_id {
        Some(id) => Ok(Json(json!({
            "authenticated": true,
            "user_id": id
        }))),
        None => Ok(Json(json!({
            "authenticated": false
        }))),
    }
}

/// Pull the two challenge cookies out of every `Cookie` header
pub fn read_challenge_cookies(headers: &HeaderMap) -> ChallengeCookies {
    let mut cookies = ChallengeCookies::default();

    for value in headers.get_all(COOKIE) {
        let value = String::from_utf8_lossy(value.as_bytes());
        for cookie in Cookie::split_parse_encoded(value.as_ref()).flatten() {
            match cookie.name() {
                CHALLENGE_COOKIE => cookies.challenge = Some(cookie.value().to_string()),
                USERNAME_COOKIE => cookies.username = Some(cookie.value().to_string()),
                _ => {}
            }
        }
    }

    cookies
}

fn challenge_cookie(name: &'static str, value: String, max_age: time::Duration, secure: bool) -> String {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(max_age)
        .build()
        .encoded()
        .to_string()
}

fn expired_cookie(name: &'static str) -> String {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::ZERO)
        .build()
        .encoded()
        .to_string()
}
