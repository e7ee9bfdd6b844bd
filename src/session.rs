//! # Session Issuing
//!
//! After a successful login the user gets a server-side session. The login
//! core only sees the [`SessionIssuer`] trait; the HTTP layer passes in the
//! request's `tower_sessions::Session`.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::fmt;
use tower_sessions::Session;

/// Session key holding the authenticated user's id
pub const USER_ID_KEY: &str = "user_id";

/// Session key holding the authenticated username
pub const USERNAME_KEY: &str = "username";

/// Opaque identifier of an established session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn create_session(&self, user_id: &str, username: &str) -> AppResult<SessionToken>;
}

#[async_trait]
impl SessionIssuer for Session {
    /// Rotates the session id first so a pre-login session id cannot be
    /// carried into the authenticated session.
    async fn create_session(&self, user_id: &str, username: &str) -> AppResult<SessionToken> {
        self.cycle_id().await?;
        self.insert(USER_ID_KEY, user_id).await?;
        self.insert(USERNAME_KEY, username).await?;
        self.save().await?;

        let id = self
            .id()
            .ok_or_else(|| AppError::Internal("Session has no id after save".to_string()))?;

        Ok(SessionToken(id.to_string()))
    }
}
