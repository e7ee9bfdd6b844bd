//! # Notification Handlers
//!
//! Reminder endpoints for the logged-in user. All routes sit behind
//! `require_auth`.

use crate::db::TodoStore;
use crate::error::AppResult;
use crate::middleware::auth::session_user_id;
use crate::state::AppState;
use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_sessions::Session;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSentRequest {
    pub todo_id: i64,
}

/// Todos whose reminder is due and has not been shown yet
///
/// ## Route
/// GET /api/notifications/check
///
/// ## Response
/// ```json
/// { "todos": [{ "id": 7, "title": "Pay rent", "due_date": "2026-10-16T07:10:00Z", ... }] }
/// ```
pub async fn due_notifications(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user_id = session_user_id(&session).await?;
    let todos = state.store.due_reminders(Some(&user_id), Utc::now()).await?;

    Ok(Json(json!({ "todos": todos })))
}

/// Record that the reminder for a todo was shown
///
/// ## Route
/// POST /api/notifications/check
///
/// ## Request
/// ```json
/// { "todoId": 7 }
/// ```
pub async fn mark_notification_sent(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<MarkSentRequest>,
) -> AppResult<Json<Value>> {
    let user_id = session_user_id(&session).await?;
    state
        .store
        .mark_notification_sent(req.todo_id, Some(&user_id), Utc::now())
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// Server-side reminder switch state
///
/// ## Route
/// GET /api/notifications/status
pub async fn notification_status(State(state): State<AppState>) -> Json<Value> {
    let reminders = &state.reminders;
    Json(json!({
        "permission": reminders.permission(),
        "muted": reminders.is_muted(),
        "enabled": reminders.is_enabled(),
    }))
}

/// Flip the mute switch
///
/// ## Route
/// POST /api/notifications/mute
pub async fn toggle_mute(State(state): State<AppState>) -> Json<Value> {
    let muted = state.reminders.toggle_mute();
    Json(json!({
        "muted": muted,
        "enabled": state.reminders.is_enabled(),
    }))
}
