//! # Configuration Management
//!
//! Configuration comes from the environment (12-factor style), optionally
//! seeded from a `.env` file.
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8080)
//! - `DATABASE_URL`: SQLite database connection string
//! - `RP_ID`: WebAuthn Relying Party ID (default: localhost)
//! - `RP_ORIGIN`: WebAuthn Relying Party Origin (full URL)
//! - `RP_NAME`: Human-readable name for your service
//! - `REQUIRE_USER_VERIFICATION`: reject assertions without the UV flag (default: false)
//! - `COUNTER_POLICY`: `strict` or `permissive` signature counter handling (default: strict)
//! - `SINGLE_CREDENTIAL_FALLBACK`: verify against a user's only credential when ids differ (default: true)
//! - `CHALLENGE_TTL_SECS`: lifetime of a login challenge (default: 300)
//! - `REMINDER_POLL_SECS`: reminder scheduler period (default: 60)
//! - `NOTIFICATIONS_MUTED`: start with reminders muted (default: false)
//!
//! The verification core never reads the environment itself; it receives the
//! [`RelyingParty`] and [`VerifierPolicy`] built here.

use crate::webauthn::counter::CounterPolicy;
use anyhow::{anyhow, Context, Result};
use std::env;
use url::Url;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number
    pub port: u16,

    /// SQLite database connection URL, e.g. "sqlite:passkey.db?mode=rwc"
    pub database_url: String,

    /// Relying Party ID: the bare domain, no scheme or port
    pub rp_id: String,

    /// Relying Party Origin: the full URL the app is served from
    pub rp_origin: String,

    /// Human-readable service name
    pub rp_name: String,

    /// Require the authenticator's user-verification flag on login
    pub require_user_verification: bool,

    /// How non-advancing signature counters are treated
    pub counter_policy: CounterPolicy,

    /// Fall back to the user's only credential when no id matches
    pub single_credential_fallback: bool,

    /// Seconds a login challenge stays valid
    pub challenge_ttl_secs: i64,

    /// Seconds between reminder checks
    pub reminder_poll_secs: u64,

    /// Whether reminders start muted
    pub notifications_muted: bool,
}

/// The single relying party this server authenticates for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    pub id: String,
    pub origin: Url,
    pub name: String,
}

/// Behavioural switches of the login verification core
///
/// `require_user_verification` defaults to `false`: any assertion is accepted
/// with or without biometric/PIN verification. This is a known security
/// trade-off; set `REQUIRE_USER_VERIFICATION=true` to close it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierPolicy {
    pub require_user_verification: bool,
    pub counter: CounterPolicy,
    pub single_credential_fallback: bool,
}

impl Default for VerifierPolicy {
    fn default() -> Self {
        Self {
            require_user_verification: false,
            counter: CounterPolicy::Strict,
            single_credential_fallback: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` first if present (dotenvy doesn't error if the file is
    /// missing), then falls back to defaults for anything unset. Malformed
    /// numbers, flags or policies are errors.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid port number")?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:passkey.db?mode=rwc".to_string()),

            rp_id: env::var("RP_ID").unwrap_or_else(|_| "localhost".to_string()),

            rp_origin: env::var("RP_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),

            rp_name: env::var("RP_NAME").unwrap_or_else(|_| "Todo App".to_string()),

            require_user_verification: env_flag("REQUIRE_USER_VERIFICATION", false)?,

            counter_policy: env::var("COUNTER_POLICY")
                .unwrap_or_else(|_| "strict".to_string())
                .parse()?,

            single_credential_fallback: env_flag("SINGLE_CREDENTIAL_FALLBACK", true)?,

            challenge_ttl_secs: env::var("CHALLENGE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("CHALLENGE_TTL_SECS must be a number of seconds")?,

            reminder_poll_secs: env::var("REMINDER_POLL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("REMINDER_POLL_SECS must be a number of seconds")?,

            notifications_muted: env_flag("NOTIFICATIONS_MUTED", false)?,
        })
    }

    /// Socket address for `tokio::net::TcpListener::bind()`, e.g. "127.0.0.1:8080"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Relying party settings, with the origin parsed and validated
    pub fn relying_party(&self) -> Result<RelyingParty> {
        let origin = Url::parse(&self.rp_origin)
            .with_context(|| format!("RP_ORIGIN '{}' is not a valid URL", self.rp_origin))?;
        if origin.host_str().is_none() {
            return Err(anyhow!("RP_ORIGIN '{}' has no host", self.rp_origin));
        }

        Ok(RelyingParty {
            id: self.rp_id.clone(),
            origin,
            name: self.rp_name.clone(),
        })
    }

    pub fn verifier_policy(&self) -> VerifierPolicy {
        VerifierPolicy {
            require_user_verification: self.require_user_verification,
            counter: self.counter_policy,
            single_credential_fallback: self.single_credential_fallback,
        }
    }
}

fn env_flag(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(value) => parse_flag(&value).ok_or_else(|| anyhow!("{name} must be true or false, got '{value}'")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
