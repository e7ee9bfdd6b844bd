use crate::db::models::AuthenticationChallenge;
use crate::error::AppResult;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

// Authentication Challenge Operations

pub async fn save_authentication_challenge(
    pool: &SqlitePool,
    challenge: &AuthenticationChallenge,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO authentication_challenges (id, username, challenge, created_at, expires_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&challenge.id)
    .bind(&challenge.username)
    .bind(&challenge.challenge)
    .bind(&challenge.created_at)
    .bind(&challenge.expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete and return the challenge issued to `username` with this value
///
/// `DELETE ... RETURNING` makes lookup and consumption one statement: of two
/// concurrent requests presenting the same challenge, only one gets the row.
/// Expiry is checked by the caller on the returned row, so an expired
/// challenge is consumed as well.
pub async fn take_authentication_challenge(
    pool: &SqlitePool,
    username: &str,
    challenge: &str,
) -> AppResult<Option<AuthenticationChallenge>> {
    let taken = sqlx::query_as::<_, AuthenticationChallenge>(
        "DELETE FROM authentication_challenges
         WHERE username = ? AND challenge = ?
         RETURNING *",
    )
    .bind(username)
    .bind(challenge)
    .fetch_optional(pool)
    .await?;

    Ok(taken)
}

// Cleanup expired challenges (run periodically from main)
pub async fn cleanup_expired_challenges(pool: &SqlitePool, now: DateTime<Utc>) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM authentication_challenges WHERE expires_at < ?")
        .bind(now.to_rfc3339())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
