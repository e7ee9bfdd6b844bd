//! # HTTP Request Handlers
//!
//! ## Submodules
//! - `health`: Health check endpoint (for monitoring)
//! - `auth`: Passkey login, logout, session info
//! - `users`: Current user profile
//! - `notifications`: Due reminders and the mute switch
//!
//! ## Handler Pattern
//! Handlers extract what they need from the request, call into the services
//! held by [`AppState`](crate::state::AppState) and return JSON:
//! ```rust,ignore
//! pub async fn my_handler(
//!     State(state): State<AppState>,   // Shared app state
//!     Json(req): Json<MyRequest>,      // JSON request body
//! ) -> AppResult<Json<Value>> {
//!     Ok(Json(json!({ ... })))
//! }
//! ```

pub mod auth;
pub mod health;
pub mod notifications;
pub mod users;
