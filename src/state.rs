//! # Application State
//!
//! Shared resources handed to every request handler. Axum clones the state
//! per request, so everything here is either a pool or behind an `Arc`.

use crate::config::Config;
use crate::db::{self, SqliteStore};
use crate::reminders::{Notifier, ReminderScheduler};
use crate::webauthn::authentication::AuthService;
use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, also used for the session store
    pub db: SqlitePool,

    /// Store behind the login core and the reminder scheduler
    pub store: Arc<SqliteStore>,

    /// Passkey login verification
    pub auth: Arc<AuthService>,

    /// Background reminder polling, also consulted by the notification routes
    pub reminders: Arc<ReminderScheduler>,
}

impl AppState {
    /// Connect to the database, run migrations and build the services
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated, or the
    /// relying-party origin is not a valid URL.
    pub async fn new(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let db = db::connect(&config.database_url).await?;
        Self::from_pool(db, config, notifier)
    }

    /// Build the services on top of an already migrated pool
    pub fn from_pool(db: SqlitePool, config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let store = Arc::new(SqliteStore::new(db.clone()));

        let auth = Arc::new(AuthService::new(
            store.clone(),
            config.relying_party()?,
            config.verifier_policy(),
            chrono::Duration::seconds(config.challenge_ttl_secs),
        ));

        let reminders = Arc::new(ReminderScheduler::new(
            store.clone(),
            notifier,
            Duration::from_secs(config.reminder_poll_secs),
            config.notifications_muted,
        ));

        Ok(AppState {
            db,
            store,
            auth,
            reminders,
        })
    }
}
