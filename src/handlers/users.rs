//! # User Handlers

use crate::db::UserStore;
use crate::error::AppResult;
use crate::middleware::auth::session_user_id;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use tower_sessions::Session;

/// Get the logged-in user's profile
///
/// ## Route
/// GET /api/users/me
///
/// ## Authentication
/// Requires authentication (protected by require_auth middleware)
///
/// ## Response
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "username": "alice",
///   "display_name": "Alice Smith",
///   "created_at": "2024-01-15T10:30:00Z"
/// }
/// ```
pub async fn get_current_user(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user_id = session_user_id(&session).await?;
    let user = state.store.find_by_id(&user_id).await?;

    Ok(Json(json!({
        "id": user.id,
        "username": user.username,
        "display_name": user.display_name,
        "created_at": user.created_at
    })))
}
