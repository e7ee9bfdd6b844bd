//! # Reminder Scheduler
//!
//! Every poll interval, while enabled, the scheduler asks the todo store for
//! due reminders, shows each one and marks the todo as notified. A todo is
//! only marked when its notification was really shown, so a failed or
//! refused notification is retried on the next poll.
//!
//! Enabled means permission granted and not muted.

use crate::db::TodoStore;
use crate::error::AppResult;
use crate::reminders::{Notifier, Permission, Reminder};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
struct NotificationState {
    permission: Permission,
    muted: bool,
}

pub struct ReminderScheduler {
    todos: Arc<dyn TodoStore>,
    notifier: Arc<dyn Notifier>,
    poll_interval: Duration,
    state: Mutex<NotificationState>,
}

impl ReminderScheduler {
    pub fn new(
        todos: Arc<dyn TodoStore>,
        notifier: Arc<dyn Notifier>,
        poll_interval: Duration,
        muted: bool,
    ) -> Self {
        Self {
            todos,
            notifier,
            poll_interval,
            state: Mutex::new(NotificationState {
                permission: Permission::Default,
                muted,
            }),
        }
    }

    pub fn permission(&self) -> Permission {
        self.state.lock().permission
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    pub fn is_enabled(&self) -> bool {
        let state = self.state.lock();
        state.permission == Permission::Granted && !state.muted
    }

    /// Ask the notifier for permission; returns whether it was granted
    pub async fn request_permission(&self) -> bool {
        let permission = self.notifier.request_permission().await;
        self.state.lock().permission = permission;
        tracing::info!(%permission, "Notification permission");
        permission == Permission::Granted
    }

    /// Flip the mute switch; returns the new muted state
    pub fn toggle_mute(&self) -> bool {
        let mut state = self.state.lock();
        state.muted = !state.muted;
        tracing::info!(muted = state.muted, "Reminder notifications toggled");
        state.muted
    }

    /// One poll: show due reminders and mark the shown ones
    ///
    /// Returns how many notifications were shown. Does nothing while disabled.
    pub async fn check_once(&self, now: DateTime<Utc>) -> AppResult<usize> {
        if !self.is_enabled() {
            return Ok(0);
        }

        let due = self.todos.due_reminders(None, now).await?;
        let mut shown = 0;

        for todo in &due {
            let Some(reminder) = Reminder::for_todo(todo, now) else {
                continue;
            };
            if !self.notifier.show(&reminder).await {
                tracing::debug!(todo_id = todo.id, "Notification not shown, will retry");
                continue;
            }
            // Unmarked todos come back next poll; keep going with the rest
            if let Err(e) = self
                .todos
                .mark_notification_sent(todo.id, Some(&todo.user_id), now)
                .await
            {
                tracing::warn!(todo_id = todo.id, "Failed to mark reminder as sent: {:?}", e);
                continue;
            }
            shown += 1;
        }

        if shown > 0 {
            tracing::debug!(shown, "Reminder check finished");
        }
        Ok(shown)
    }

    /// Poll forever; the first check runs immediately
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            if let Err(e) = self.check_once(Utc::now()).await {
                tracing::error!("Reminder check failed: {:?}", e);
            }
        }
    }
}
