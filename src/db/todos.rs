//! # Todo Reminder Queries
//!
//! Only the reminder side of todos lives here: finding todos whose reminder
//! is due and recording that a notification went out. Todo CRUD belongs to
//! the rest of the application.

use crate::db::models::Todo;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Open, not-yet-notified todos whose reminder time has arrived
///
/// SQLite narrows to candidates; the due-date arithmetic happens in Rust
/// because dates are stored as RFC3339 text with arbitrary offsets.
pub async fn find_due_reminders(
    pool: &SqlitePool,
    user_id: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<Vec<Todo>> {
    let candidates = sqlx::query_as::<_, Todo>(
        "SELECT * FROM todos
         WHERE completed = FALSE
           AND last_notification_sent IS NULL
           AND due_date IS NOT NULL
           AND reminder_minutes IS NOT NULL
           AND (? IS NULL OR user_id = ?)
         ORDER BY due_date",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(candidates
        .into_iter()
        .filter(|todo| todo.reminder_due(now))
        .collect())
}

/// Record that the reminder for `todo_id` was shown
///
/// When `user_id` is given the todo must belong to that user.
pub async fn mark_notification_sent(
    pool: &SqlitePool,
    todo_id: i64,
    user_id: Option<&str>,
    sent_at: DateTime<Utc>,
) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE todos SET last_notification_sent = ?
         WHERE id = ? AND (? IS NULL OR user_id = ?)",
    )
    .bind(sent_at.to_rfc3339())
    .bind(todo_id)
    .bind(user_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Todo {} not found", todo_id)));
    }

    Ok(())
}

/// Insert a todo; the todo screens own creation, this serves seeding and tests
pub async fn insert_todo(pool: &SqlitePool, todo: &Todo) -> AppResult<i64> {
    let result = sqlx::query(
        "INSERT INTO todos (user_id, title, due_date, reminder_minutes, completed, last_notification_sent)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&todo.user_id)
    .bind(&todo.title)
    .bind(&todo.due_date)
    .bind(todo.reminder_minutes)
    .bind(todo.completed)
    .bind(&todo.last_notification_sent)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}
