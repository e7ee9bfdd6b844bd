//! # Credential Database Operations
//!
//! Passkey credentials hold the public keys used to verify logins.
//!
//! ## Security Note
//! Only public keys are stored - private keys never leave the user's device.

use crate::db::models::PasskeyCredential;
use crate::error::AppResult;
use chrono::Utc;
use sqlx::SqlitePool;

/// Save a passkey credential
///
/// Registration is handled elsewhere; this is the write side it (and test
/// fixtures) use. `credential.id` must already be in the stored encoding
/// (standard base64).
pub async fn save_credential(pool: &SqlitePool, credential: &PasskeyCredential) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO passkey_credentials
         (id, user_id, credential_public_key, counter, transports, backup_eligible, backup_state, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&credential.id)
    .bind(&credential.user_id)
    .bind(&credential.credential_public_key)
    .bind(credential.counter)
    .bind(&credential.transports)
    .bind(credential.backup_eligible)
    .bind(credential.backup_state)
    .bind(&credential.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get all credentials for a user
///
/// Returns an empty vector if the user has none; errors only on database
/// failure.
pub async fn find_by_user_id(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<PasskeyCredential>> {
    let credentials = sqlx::query_as::<_, PasskeyCredential>(
        "SELECT * FROM passkey_credentials WHERE user_id = ? ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(credentials)
}

/// Read the stored signature counter, `None` if the credential is gone
pub async fn current_counter(pool: &SqlitePool, credential_id: &str) -> AppResult<Option<u32>> {
    let counter: Option<i64> =
        sqlx::query_scalar("SELECT counter FROM passkey_credentials WHERE id = ?")
            .bind(credential_id)
            .fetch_optional(pool)
            .await?;

    Ok(counter.map(|c| u32::try_from(c).unwrap_or(u32::MAX)))
}

/// Atomically replace the signature counter if it still holds `expected`
///
/// The `WHERE counter = ?` clause makes the read-compare-write a single
/// statement, so two logins racing on one credential cannot both apply a
/// stale comparison. Also stamps `last_used_at`.
///
/// Returns `false` when the stored value was no longer `expected` (or the
/// credential disappeared).
pub async fn compare_and_swap_counter(
    pool: &SqlitePool,
    credential_id: &str,
    expected: u32,
    new_counter: u32,
) -> AppResult<bool> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        "UPDATE passkey_credentials
         SET counter = ?, last_used_at = ?
         WHERE id = ? AND counter = ?",
    )
    .bind(new_counter as i64)
    .bind(now)
    .bind(credential_id)
    .bind(expected as i64)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
