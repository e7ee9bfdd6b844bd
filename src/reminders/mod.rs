//! # Todo Reminders
//!
//! Polls for todos whose reminder time has arrived and shows a notification
//! for each one through a [`Notifier`].
//!
//! ## Submodules
//! - `notifier`: where notifications are shown, and the permission to show them
//! - `scheduler`: the polling loop plus the mute switch
//!
//! ## Reminder text
//! Minutes left until the due date are floored:
//! - more than zero: `Due in N minutes`
//! - exactly zero: `Due now!`
//! - overdue: `Due: <date>`, rendered in Singapore time

pub mod notifier;
pub mod scheduler;

pub use notifier::{LogNotifier, Notifier, Permission};
pub use scheduler::ReminderScheduler;

use crate::db::models::Todo;
use chrono::{DateTime, Utc};
use chrono_tz::Asia::Singapore;
use serde::Serialize;

/// Date format used for overdue reminders, e.g. `16/10/2026, 3:30 pm`
const DUE_DATE_FORMAT: &str = "%d/%m/%Y, %-I:%M %P";

/// A notification ready to be shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub todo_id: i64,
    pub title: String,
    pub body: String,
    /// Replaces an earlier notification with the same tag
    pub tag: String,
    pub require_interaction: bool,
}

impl Reminder {
    /// Build the notification for `todo`; `None` when it has no usable due date
    pub fn for_todo(todo: &Todo, now: DateTime<Utc>) -> Option<Self> {
        let due = todo.due_at()?;
        Some(Self {
            todo_id: todo.id,
            title: format!("📋 {}", todo.title),
            body: reminder_body(due, now),
            tag: format!("todo-{}", todo.id),
            require_interaction: true,
        })
    }
}

pub fn reminder_body(due: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let millis = (due - now).num_milliseconds();
    let minutes_left = millis.div_euclid(60_000);

    match minutes_left {
        m if m > 0 => format!("Due in {m} minutes"),
        0 => "Due now!".to_string(),
        _ => format!(
            "Due: {}",
            due.with_timezone(&Singapore).format(DUE_DATE_FORMAT)
        ),
    }
}
