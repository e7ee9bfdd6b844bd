//! # Database Models
//!
//! Data structures that map to database tables. Timestamps are RFC 3339
//! strings, the way SQLite stores them as text.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account information
///
/// Each user can have multiple passkey credentials. Users are created at
/// registration time and never modified by the login flow.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Unique username, used for login lookup
    pub username: String,

    /// Human-readable display name
    pub display_name: String,

    /// When the user account was created (RFC3339 timestamp)
    pub created_at: String,

    /// When the user account was last updated (RFC3339 timestamp)
    pub updated_at: String,
}

impl User {
    /// Create a new user with generated ID and timestamps
    pub fn new(username: String, display_name: String) -> Self {
        let now = Utc::now().to_rfc3339();

        Self {
            id: Uuid::new_v4().to_string(),
            username,
            display_name,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Passkey credential stored for a user
///
/// Only the public key is stored; the private key never leaves the
/// authenticator.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PasskeyCredential {
    /// Credential identifier in standard (padded) base64
    pub id: String,

    /// ID of the user who owns this credential
    pub user_id: String,

    /// COSE_Key encoding of the credential's public key
    pub credential_public_key: Vec<u8>,

    /// Signature counter
    ///
    /// Non-decreasing across successful logins. `0` is the initial state and,
    /// when the authenticator keeps reporting `0`, means it has no counter.
    pub counter: i64,

    /// Supported transports as a JSON array, e.g. `["usb", "nfc"]`
    pub transports: Option<String>,

    /// Whether the credential is eligible for backup (synced passkey)
    pub backup_eligible: bool,

    /// Whether the credential is currently backed up
    pub backup_state: bool,

    /// When the credential was created (RFC3339 timestamp)
    pub created_at: String,

    /// When the credential last completed a login (RFC3339 timestamp)
    pub last_used_at: Option<String>,
}

impl PasskeyCredential {
    pub fn new(id: String, user_id: String, credential_public_key: Vec<u8>, counter: u32) -> Self {
        Self {
            id,
            user_id,
            credential_public_key,
            counter: counter as i64,
            transports: None,
            backup_eligible: false,
            backup_state: false,
            created_at: Utc::now().to_rfc3339(),
            last_used_at: None,
        }
    }

    /// The stored counter as the authenticator's 32-bit value
    pub fn signature_counter(&self) -> u32 {
        u32::try_from(self.counter).unwrap_or(u32::MAX)
    }
}

/// Authentication challenge for passkey login
///
/// Issued when a login starts and bound to a username. The browser holds the
/// challenge and username in cookies; this row is the server-side record that
/// makes the challenge single-use.
///
/// ## Challenge Lifecycle
/// 1. Login options requested → row inserted, cookies set
/// 2. Assertion posted → row deleted and returned in one statement
/// 3. If the row was missing or expired → `SessionExpired`, user restarts
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthenticationChallenge {
    /// Unique challenge identifier (UUID)
    pub id: String,

    /// Username the challenge was issued for
    pub username: String,

    /// Base64url challenge value the authenticator signs over
    pub challenge: String,

    /// When the challenge was created (RFC3339 timestamp)
    pub created_at: String,

    /// When the challenge expires (RFC3339 timestamp)
    pub expires_at: String,
}

impl AuthenticationChallenge {
    pub fn new(username: String, challenge: String, ttl: Duration) -> Self {
        let now = Utc::now();
        let expires = now + ttl;

        Self {
            id: Uuid::new_v4().to_string(),
            username,
            challenge,
            created_at: now.to_rfc3339(),
            expires_at: expires.to_rfc3339(),
        }
    }

    /// Expired challenges are treated exactly like missing ones.
    /// An unparseable expiry counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires_at) => now > expires_at,
            Err(_) => true,
        }
    }
}

/// The reminder-related columns of a todo item
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Todo {
    pub id: i64,
    pub user_id: String,
    pub title: String,

    /// Due date (RFC3339 timestamp); todos without one never remind
    pub due_date: Option<String>,

    /// How many minutes before the due date the reminder fires
    pub reminder_minutes: Option<i64>,

    pub completed: bool,

    /// When a reminder was last shown for this todo (RFC3339 timestamp)
    pub last_notification_sent: Option<String>,
}

impl Todo {
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        let due = self.due_date.as_deref()?;
        DateTime::parse_from_rfc3339(due)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }

    /// A todo needs a reminder once `now` reaches `due - reminder_minutes`,
    /// as long as it is open and has not been notified yet.
    pub fn reminder_due(&self, now: DateTime<Utc>) -> bool {
        if self.completed || self.last_notification_sent.is_some() {
            return false;
        }
        match (self.due_at(), self.reminder_minutes) {
            (Some(due), Some(minutes)) => now >= due - Duration::minutes(minutes),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(due: &str, minutes: Option<i64>) -> Todo {
        Todo {
            id: 1,
            user_id: "u1".to_string(),
            title: "Pay rent".to_string(),
            due_date: Some(due.to_string()),
            reminder_minutes: minutes,
            completed: false,
            last_notification_sent: None,
        }
    }

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn reminder_fires_inside_lead_time() {
        let t = todo("2024-05-01T10:00:00Z", Some(15));
        assert!(!t.reminder_due(at("2024-05-01T09:44:59Z")));
        assert!(t.reminder_due(at("2024-05-01T09:45:00Z")));
        assert!(t.reminder_due(at("2024-05-01T11:00:00Z")));
    }

    #[test]
    fn no_reminder_without_lead_time_or_after_notifying() {
        assert!(!todo("2024-05-01T10:00:00Z", None).reminder_due(at("2024-05-01T10:00:00Z")));

        let mut sent = todo("2024-05-01T10:00:00Z", Some(5));
        sent.last_notification_sent = Some("2024-05-01T09:55:00Z".to_string());
        assert!(!sent.reminder_due(at("2024-05-01T10:00:00Z")));

        let mut done = todo("2024-05-01T10:00:00Z", Some(5));
        done.completed = true;
        assert!(!done.reminder_due(at("2024-05-01T10:00:00Z")));
    }

    #[test]
    fn challenge_expiry() {
        let challenge = AuthenticationChallenge::new(
            "alice".to_string(),
            "abc".to_string(),
            Duration::minutes(5),
        );
        assert!(!challenge.is_expired_at(Utc::now()));
        assert!(challenge.is_expired_at(Utc::now() + Duration::minutes(6)));
    }

    #[test]
    fn unparseable_expiry_counts_as_expired() {
        let mut challenge = AuthenticationChallenge::new(
            "alice".to_string(),
            "abc".to_string(),
            Duration::minutes(5),
        );
        challenge.expires_at = "tomorrow".to_string();
        assert!(challenge.is_expired_at(Utc::now()));
    }
}
