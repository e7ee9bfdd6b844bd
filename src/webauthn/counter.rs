//! # Signature Counter Guard
//!
//! Authenticators that support it increment a counter on every signature.
//! A counter that fails to advance means the assertion was replayed or the
//! authenticator was cloned.
//!
//! ## Policies
//! - `Strict`: the new counter must be greater than the stored one. Both
//!   being `0` means the authenticator has no counter and is accepted.
//! - `Permissive`: whatever the authenticator reports is stored.
//!
//! ## Persistence
//! The new value is written with compare-and-swap. When another login wins
//! the race the guard re-reads the stored counter and judges again, so a
//! stale comparison never overwrites a newer counter.

use crate::db::CredentialStore;
use crate::error::AppError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How many times a lost compare-and-swap is re-evaluated
const MAX_SWAP_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterPolicy {
    #[default]
    Strict,
    Permissive,
}

impl FromStr for CounterPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CounterPolicy::Strict),
            "permissive" => Ok(CounterPolicy::Permissive),
            other => Err(anyhow::anyhow!(
                "COUNTER_POLICY must be 'strict' or 'permissive', got '{other}'"
            )),
        }
    }
}

impl fmt::Display for CounterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterPolicy::Strict => f.write_str("strict"),
            CounterPolicy::Permissive => f.write_str("permissive"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("signature counter did not advance (stored {stored}, presented {presented})")]
    NotAdvanced { stored: u32, presented: u32 },

    #[error("credential disappeared during counter update")]
    CredentialMissing,

    #[error("counter update kept losing to concurrent logins")]
    Contended,

    #[error(transparent)]
    Store(#[from] AppError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterGuard {
    pub policy: CounterPolicy,
}

impl CounterGuard {
    pub fn new(policy: CounterPolicy) -> Self {
        Self { policy }
    }

    /// Judge a presented counter against the stored one
    pub fn check(&self, stored: u32, presented: u32) -> Result<(), CounterError> {
        match self.policy {
            CounterPolicy::Permissive => Ok(()),
            CounterPolicy::Strict if stored == 0 && presented == 0 => Ok(()),
            CounterPolicy::Strict if presented > stored => Ok(()),
            CounterPolicy::Strict => Err(CounterError::NotAdvanced { stored, presented }),
        }
    }

    /// Check and persist `presented` as the credential's counter
    ///
    /// `stored` is the value read together with the credential. Nothing is
    /// written when the check fails.
    pub async fn commit(
        &self,
        store: &dyn CredentialStore,
        credential_id: &str,
        stored: u32,
        presented: u32,
    ) -> Result<(), CounterError> {
        let mut expected = stored;

        for _ in 0..MAX_SWAP_ATTEMPTS {
            self.check(expected, presented)?;

            if store
                .compare_and_swap_counter(credential_id, expected, presented)
                .await?
            {
                tracing::debug!(credential_id, from = expected, to = presented, "Counter updated");
                return Ok(());
            }

            match store.current_counter(credential_id).await? {
                Some(current) => {
                    tracing::debug!(
                        credential_id,
                        expected,
                        current,
                        "Counter changed underneath, re-checking"
                    );
                    expected = current;
                }
                None => return Err(CounterError::CredentialMissing),
            }
        }

        Err(CounterError::Contended)
    }
}
