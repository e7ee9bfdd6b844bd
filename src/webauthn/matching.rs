//! Credential matching
//!
//! Picks the one stored credential an assertion is verified against.

use crate::db::models::PasskeyCredential;
use crate::webauthn::credential_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Submitted and stored ids name the same bytes
    Exact,
    /// No id matched; the user's only credential was taken instead
    SingleCredentialFallback,
}

#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub credential: &'a PasskeyCredential,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingPolicy {
    /// Accounts with exactly one credential verify against it even when the
    /// submitted id does not match (ids written under a different encoding
    /// at registration time). Never applies to multi-credential accounts.
    pub single_credential_fallback: bool,
}

impl MatchingPolicy {
    pub fn select<'a>(
        &self,
        submitted_id: &str,
        credentials: &'a [PasskeyCredential],
    ) -> Option<Candidate<'a>> {
        if let Some(submitted) = credential_id::decode(submitted_id) {
            let exact = credentials
                .iter()
                .find(|c| credential_id::decode(&c.id).as_deref() == Some(submitted.as_slice()));
            if let Some(credential) = exact {
                return Some(Candidate {
                    credential,
                    kind: MatchKind::Exact,
                });
            }
        }

        match credentials {
            [only] if self.single_credential_fallback => {
                tracing::debug!(
                    credential_id = %only.id,
                    "No exact credential match, using the user's single credential"
                );
                Some(Candidate {
                    credential: only,
                    kind: MatchKind::SingleCredentialFallback,
                })
            }
            _ => None,
        }
    }
}
