//! # Error Handling
//!
//! Two error types live here:
//! - [`AppError`]: infrastructure failures (database, serialization, sessions)
//!   and plain HTTP errors for the non-login endpoints.
//! - [`AuthFailure`]: the declarative outcome of a failed login verification.
//!
//! Both convert into HTTP responses. Detailed causes are logged with `tracing`
//! and never echoed back to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type
///
/// The `#[from]` attributes let `?` convert library errors into `AppError`:
/// ```rust,ignore
/// let row = sqlx::query(...).fetch_one(pool).await?; // sqlx::Error -> AppError::Database
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors (SQLx library errors)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session store errors (tower-sessions)
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found errors (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request errors (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication/authorization errors (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server errors (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response
///
/// Library errors are logged in full and replaced by a generic message;
/// the hand-written variants carry messages that are safe to show.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Serialization error".to_string())
            }
            AppError::Session(e) => {
                tracing::error!("Session error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Session error".to_string())
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Why a login verification was rejected
///
/// Each variant is one terminal `Rejected` state of the login state machine.
/// The client must restart the challenge flow after any of them; retrying the
/// same assertion never helps.
///
/// ## Client-visible categories
/// The data-resolution failures and the cryptographic failure share one
/// status code and one message, so a client cannot tell an unknown username
/// apart from a bad signature.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Challenge cookies missing, or the challenge session is gone or expired
    #[error("authentication session expired")]
    SessionExpired,

    #[error("user not found")]
    UserNotFound,

    #[error("no authenticators registered for user")]
    NoAuthenticatorsRegistered,

    /// No exact credential match and the single-credential fallback did not apply
    #[error("authenticator not found")]
    AuthenticatorNotFound,

    /// Signature, challenge, origin, rp id or counter check failed
    #[error("verification failed")]
    VerificationFailed,

    /// Store, session or other unexpected fault
    #[error("internal error")]
    InternalError,
}

impl AuthFailure {
    /// HTTP status and the generic message shown to the client
    pub fn public_response(&self) -> (StatusCode, &'static str) {
        match self {
            AuthFailure::SessionExpired => {
                (StatusCode::BAD_REQUEST, "Authentication session expired")
            }
            AuthFailure::UserNotFound
            | AuthFailure::NoAuthenticatorsRegistered
            | AuthFailure::AuthenticatorNotFound
            | AuthFailure::VerificationFailed => {
                (StatusCode::UNAUTHORIZED, "Authentication failed")
            }
            AuthFailure::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed")
            }
        }
    }
}

/// Infrastructure errors surface as `InternalError` at the login boundary.
impl From<AppError> for AuthFailure {
    fn from(err: AppError) -> Self {
        tracing::error!("Login verification aborted: {:?}", err);
        AuthFailure::InternalError
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let (status, message) = self.public_response();
        (status, Json(json!({ "error": message }))).into_response()
    }
}
