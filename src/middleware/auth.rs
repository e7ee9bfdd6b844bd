use crate::error::AppError;
use crate::session::USER_ID_KEY;
use axum::{extract::Request, middleware::Next, response::Response};
use tower_sessions::Session;

/// Reject requests without a logged-in session
pub async fn require_auth(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id: Option<String> = session.get(USER_ID_KEY).await?;

    match user_id {
        Some(_) => Ok(next.run(request).await),
        None => Err(AppError::Unauthorized("Not authenticated".to_string())),
    }
}

/// The logged-in user's id, for handlers behind [`require_auth`]
pub async fn session_user_id(session: &Session) -> Result<String, AppError> {
    session
        .get::<String>(USER_ID_KEY)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
}
