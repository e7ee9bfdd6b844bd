//! # Database Module
//!
//! - `models`: Data structures (User, Credential, Challenge, Todo)
//! - `users`, `credentials`, `challenges`, `todos`: SQLite queries per table
//! - `memory`: in-process implementation of the same store traits
//!
//! The login core and the reminder scheduler talk to storage only through
//! the traits below. [`SqliteStore`] backs them in the server; tests can swap
//! in [`memory::MemoryStore`].

pub mod challenges;
pub mod credentials;
pub mod memory;
pub mod models;
pub mod todos;
pub mod users;

use crate::db::models::{AuthenticationChallenge, PasskeyCredential, Todo, User};
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Profile lookups for an established session; a missing user is `NotFound`.
    async fn find_by_id(&self, user_id: &str) -> AppResult<User>;
}

/// Registered credentials and their signature counters
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn save_credential(&self, credential: &PasskeyCredential) -> AppResult<()>;

    async fn find_by_user_id(&self, user_id: &str) -> AppResult<Vec<PasskeyCredential>>;

    async fn current_counter(&self, credential_id: &str) -> AppResult<Option<u32>>;

    /// Set the counter to `new_counter` only if it currently equals `expected`.
    /// Must be atomic per credential; returns whether the swap happened.
    async fn compare_and_swap_counter(
        &self,
        credential_id: &str,
        expected: u32,
        new_counter: u32,
    ) -> AppResult<bool>;
}

/// Single-use login challenges
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn save_authentication_challenge(&self, challenge: &AuthenticationChallenge) -> AppResult<()>;

    /// Remove and return the matching challenge in one atomic step.
    async fn take_authentication_challenge(
        &self,
        username: &str,
        challenge: &str,
    ) -> AppResult<Option<AuthenticationChallenge>>;

    /// Drop challenges that expired before `now`; returns how many went.
    async fn cleanup_expired_challenges(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn due_reminders(&self, user_id: Option<&str>, now: DateTime<Utc>) -> AppResult<Vec<Todo>>;

    async fn mark_notification_sent(
        &self,
        todo_id: i64,
        user_id: Option<&str>,
        sent_at: DateTime<Utc>,
    ) -> AppResult<()>;
}

/// Open a pool and bring the schema up to date
///
/// In-memory databases are per-connection in SQLite, so `sqlite::memory:`
/// URLs get a single-connection pool.
pub async fn connect(database_url: &str) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let max_connections = if database_url.contains(":memory:") { 1 } else { 8 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;

    Ok(pool)
}

/// SQLite-backed implementation of every store trait
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        users::find_by_username(&self.pool, username).await
    }

    async fn find_by_id(&self, user_id: &str) -> AppResult<User> {
        users::find_by_id(&self.pool, user_id).await
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn save_credential(&self, credential: &PasskeyCredential) -> AppResult<()> {
        credentials::save_credential(&self.pool, credential).await
    }

    async fn find_by_user_id(&self, user_id: &str) -> AppResult<Vec<PasskeyCredential>> {
        credentials::find_by_user_id(&self.pool, user_id).await
    }

    async fn current_counter(&self, credential_id: &str) -> AppResult<Option<u32>> {
        credentials::current_counter(&self.pool, credential_id).await
    }

    async fn compare_and_swap_counter(
        &self,
        credential_id: &str,
        expected: u32,
        new_counter: u32,
    ) -> AppResult<bool> {
        credentials::compare_and_swap_counter(&self.pool, credential_id, expected, new_counter).await
    }
}

#[async_trait]
impl ChallengeStore for SqliteStore {
    async fn save_authentication_challenge(&self, challenge: &AuthenticationChallenge) -> AppResult<()> {
        challenges::save_authentication_challenge(&self.pool, challenge).await
    }

    async fn take_authentication_challenge(
        &self,
        username: &str,
        challenge: &str,
    ) -> AppResult<Option<AuthenticationChallenge>> {
        challenges::take_authentication_challenge(&self.pool, username, challenge).await
    }

    async fn cleanup_expired_challenges(&self, now: DateTime<Utc>) -> AppResult<u64> {
        challenges::cleanup_expired_challenges(&self.pool, now).await
    }
}

#[async_trait]
impl TodoStore for SqliteStore {
    async fn due_reminders(&self, user_id: Option<&str>, now: DateTime<Utc>) -> AppResult<Vec<Todo>> {
        todos::find_due_reminders(&self.pool, user_id, now).await
    }

    async fn mark_notification_sent(
        &self,
        todo_id: i64,
        user_id: Option<&str>,
        sent_at: DateTime<Utc>,
    ) -> AppResult<()> {
        todos::mark_notification_sent(&self.pool, todo_id, user_id, sent_at).await
    }
}
