//! # Passkey Todo Server
//!
//! Passwordless login for a todo application, verified against registered
//! passkeys, plus a background scheduler that shows reminders for due todos.
//!
//! ## Layout
//! - `webauthn`: assertion verification, counter guard, login flow
//! - `reminders`: reminder text and the polling scheduler
//! - `db`: SQLite and in-memory stores
//! - `handlers`, `middleware`: the axum HTTP surface

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod reminders;
pub mod session;
pub mod state;
pub mod webauthn;

use crate::handlers::auth::{login_options, login_verify, logout, session_info};
use crate::handlers::health::health_check;
use crate::handlers::notifications::{
    due_notifications, mark_notification_sent, notification_status, toggle_mute,
};
use crate::handlers::users::get_current_user;
use crate::state::AppState;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

/// Build the application router on top of `session_store`
pub fn router<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let secure = state.auth.relying_party().origin.scheme() == "https";
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure)
        .with_expiry(Expiry::OnInactivity(Duration::hours(24)));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected_routes = Router::new()
        .route("/api/users/me", get(get_current_user))
        .route(
            "/api/notifications/check",
            get(due_notifications).post(mark_notification_sent),
        )
        .route("/api/notifications/status", get(notification_status))
        .route("/api/notifications/mute", post(toggle_mute))
        .layer(axum_middleware::from_fn(middleware::auth::require_auth));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/login-options", post(login_options))
        .route("/api/auth/login-verify", post(login_verify))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session_info))
        .merge(protected_routes)
        .fallback_service(ServeDir::new("static"))
        .layer(session_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
