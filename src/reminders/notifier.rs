//! Notification sinks

use crate::reminders::Reminder;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// Whether notifications may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not asked yet
    #[default]
    Default,
    Granted,
    Denied,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Default => f.write_str("default"),
            Permission::Granted => f.write_str("granted"),
            Permission::Denied => f.write_str("denied"),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask for permission to show notifications
    async fn request_permission(&self) -> Permission;

    /// Show `reminder`; returns whether it was actually shown
    async fn show(&self, reminder: &Reminder) -> bool;
}

/// Writes reminders to the log
///
/// Nobody reads a log line as a notification, so this sink never grants
/// permission: the scheduler stays idle and due reminders remain pending for
/// clients polling `/api/notifications/check`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn request_permission(&self) -> Permission {
        Permission::Default
    }

    async fn show(&self, reminder: &Reminder) -> bool {
        tracing::info!(
            todo_id = reminder.todo_id,
            tag = %reminder.tag,
            body = %reminder.body,
            "{}",
            reminder.title
        );
        true
    }
}
