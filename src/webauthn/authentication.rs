//! # Passkey Login
//!
//! ## Login Flow
//! 1. **Start** (`start_authentication`): issue a random challenge bound to
//!    the username; the browser keeps both in cookies.
//! 2. **Finish** (`finish_authentication`): consume the challenge, resolve
//!    user and credential, verify the assertion, advance the counter,
//!    issue a session.
//!
//! ## States
//! `ChallengeIssued → AssertionReceived → {Verified, Rejected}`. Every
//! rejection is terminal: the client starts over with a fresh challenge.
//! The challenge row is deleted the moment it is found, whatever happens
//! next, so no challenge ever backs two verification attempts.

use crate::config::{RelyingParty, VerifierPolicy};
use crate::db::models::AuthenticationChallenge;
use crate::db::{ChallengeStore, CredentialStore, UserStore};
use crate::error::{AppError, AppResult, AuthFailure};
use crate::session::SessionIssuer;
use crate::webauthn::counter::{CounterError, CounterGuard};
use crate::webauthn::credential_id;
use crate::webauthn::matching::MatchingPolicy;
use crate::webauthn::types::{
    AuthSuccess, AuthenticationResponse, ChallengeCookies, CredentialDescriptor, RequestOptions,
};
use crate::webauthn::verifier::{AssertionVerifier, ExpectedAssertion};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use std::sync::Arc;
use url::Url;

/// Client-side timeout advertised in the request options
pub const LOGIN_TIMEOUT_MS: u32 = 60_000;

/// Login verification service
///
/// Holds the stores it needs and the explicit relying-party configuration,
/// so nothing here reads process environment.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    credentials: Arc<dyn CredentialStore>,
    challenges: Arc<dyn ChallengeStore>,
    relying_party: RelyingParty,
    verifier: AssertionVerifier,
    matching: MatchingPolicy,
    counter: CounterGuard,
    challenge_ttl: Duration,
}

impl AuthService {
    pub fn new<S>(
        store: Arc<S>,
        relying_party: RelyingParty,
        policy: VerifierPolicy,
        challenge_ttl: Duration,
    ) -> Self
    where
        S: UserStore + CredentialStore + ChallengeStore + 'static,
    {
        Self {
            users: store.clone(),
            credentials: store.clone(),
            challenges: store,
            relying_party,
            verifier: AssertionVerifier::new(policy.require_user_verification),
            matching: MatchingPolicy {
                single_credential_fallback: policy.single_credential_fallback,
            },
            counter: CounterGuard::new(policy.counter),
            challenge_ttl,
        }
    }

    pub fn relying_party(&self) -> &RelyingParty {
        &self.relying_party
    }

    pub fn challenge_ttl(&self) -> Duration {
        self.challenge_ttl
    }

    /// Issue a login challenge for `username`
    ///
    /// Unknown usernames get a challenge too, with an empty allow list, so
    /// this endpoint does not reveal which accounts exist.
    pub async fn start_authentication(
        &self,
        username: &str,
    ) -> AppResult<(RequestOptions, AuthenticationChallenge)> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::BadRequest("Username is required".to_string()));
        }

        let challenge_bytes: [u8; 32] = rand::random();
        let challenge = AuthenticationChallenge::new(
            username.to_string(),
            URL_SAFE_NO_PAD.encode(challenge_bytes),
            self.challenge_ttl,
        );
        self.challenges.save_authentication_challenge(&challenge).await?;

        let allow_credentials = match self.users.find_by_username(username).await? {
            Some(user) => self
                .credentials
                .find_by_user_id(&user.id)
                .await?
                .iter()
                .filter_map(|c| credential_id::canonical(&c.id))
                .map(|id| CredentialDescriptor {
                    type_: "public-key".to_string(),
                    id,
                })
                .collect(),
            None => Vec::new(),
        };

        tracing::debug!(username, "Issued login challenge");

        let options = RequestOptions {
            challenge: challenge.challenge.clone(),
            timeout: LOGIN_TIMEOUT_MS,
            rp_id: self.relying_party.id.clone(),
            allow_credentials,
            user_verification: if self.verifier.require_user_verification {
                "required".to_string()
            } else {
                "preferred".to_string()
            },
        };

        Ok((options, challenge))
    }

    /// Verify a posted assertion and, on success, establish a session
    ///
    /// `request_origin` is the request's `Origin` header, if any; when
    /// present it must be the configured origin.
    pub async fn finish_authentication(
        &self,
        assertion: &AuthenticationResponse,
        cookies: &ChallengeCookies,
        request_origin: Option<&str>,
        sessions: &dyn SessionIssuer,
    ) -> Result<AuthSuccess, AuthFailure> {
        let Some((challenge, username)) = cookies.pair() else {
            tracing::info!("Login rejected: challenge cookies missing");
            return Err(AuthFailure::SessionExpired);
        };

        // ChallengeIssued -> AssertionReceived
        let issued = self
            .challenges
            .take_authentication_challenge(username, challenge)
            .await?;
        let issued = match issued {
            Some(issued) if !issued.is_expired_at(Utc::now()) => issued,
            Some(_) => {
                tracing::info!(username, "Login rejected: challenge expired");
                return Err(AuthFailure::SessionExpired);
            }
            None => {
                tracing::info!(username, "Login rejected: no matching challenge session");
                return Err(AuthFailure::SessionExpired);
            }
        };

        let Some(user) = self.users.find_by_username(username).await? else {
            tracing::info!(username, "Login rejected: user not found");
            return Err(AuthFailure::UserNotFound);
        };

        let credentials = self.credentials.find_by_user_id(&user.id).await?;
        if credentials.is_empty() {
            tracing::info!(username, "Login rejected: no authenticators registered");
            return Err(AuthFailure::NoAuthenticatorsRegistered);
        }

        let Some(candidate) = self.matching.select(&assertion.id, &credentials) else {
            tracing::info!(
                username,
                submitted = %assertion.id,
                registered = credentials.len(),
                "Login rejected: authenticator not found"
            );
            return Err(AuthFailure::AuthenticatorNotFound);
        };

        if let Some(origin) = request_origin {
            if !self.origin_matches(origin) {
                tracing::warn!(
                    username,
                    origin,
                    expected = %self.relying_party.origin,
                    "Login rejected: request origin mismatch"
                );
                return Err(AuthFailure::VerificationFailed);
            }
        }

        let expected = ExpectedAssertion {
            challenge: &issued.challenge,
            origin: &self.relying_party.origin,
            rp_id: &self.relying_party.id,
        };
        let stored_counter = candidate.credential.signature_counter();
        tracing::debug!(
            username,
            credential_id = %candidate.credential.id,
            match_kind = ?candidate.kind,
            stored_counter,
            "Verifying assertion"
        );

        let result = self.verifier.verify(assertion, &expected, &candidate);
        if !result.verified {
            return Err(AuthFailure::VerificationFailed);
        }

        match self
            .counter
            .commit(
                self.credentials.as_ref(),
                &candidate.credential.id,
                stored_counter,
                result.new_counter,
            )
            .await
        {
            Ok(()) => {}
            Err(CounterError::Store(e)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(
                    username,
                    credential_id = %candidate.credential.id,
                    reason = %e,
                    "Login rejected: possible replayed or cloned authenticator"
                );
                return Err(AuthFailure::VerificationFailed);
            }
        }

        let session = sessions.create_session(&user.id, &user.username).await?;

        tracing::info!(
            username,
            user_id = %user.id,
            counter = result.new_counter,
            "Login verified"
        );

        Ok(AuthSuccess {
            user_id: user.id,
            username: user.username,
            session,
        })
    }

    fn origin_matches(&self, origin: &str) -> bool {
        match Url::parse(origin) {
            Ok(url) => url.origin() == self.relying_party.origin.origin(),
            Err(_) => false,
        }
    }
}
