//! # Health Check Handler
//!
//! Used by load balancers and monitoring systems.

use axum::Json;
use serde_json::{json, Value};

/// Health check endpoint
///
/// ## Route
/// GET /health
///
/// ## Response
/// ```json
/// {
///   "status": "healthy",
///   "service": "passkey-todo-server"
/// }
/// ```
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "passkey-todo-server"
    }))
}
