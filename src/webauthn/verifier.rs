//! # Assertion Verification
//!
//! Checks that a login assertion was signed by the private key behind a
//! stored credential, over the challenge we issued, for our origin and
//! relying party ID.
//!
//! ## What gets verified?
//! 1. Credential type is `public-key` and `id`/`rawId` agree
//! 2. The id belongs to the candidate credential (exact matches only)
//! 3. clientDataJSON: type `webauthn.get`, our challenge, our origin
//! 4. authenticatorData: rpIdHash = SHA-256(rp id), user present,
//!    user verified when the policy demands it
//! 5. ES256 signature over `authenticatorData || SHA-256(clientDataJSON)`
//!    with the stored public key
//!
//! Verification has no side effects. The counter it returns is handed to the
//! counter guard, which decides whether it may be stored.

use crate::webauthn::authenticator_data::{rp_id_hash, AuthenticatorData, AuthenticatorDataError};
use crate::webauthn::cose::{self, CoseKeyError};
use crate::webauthn::credential_id;
use crate::webauthn::matching::{Candidate, MatchKind};
use crate::webauthn::types::{AssertionResult, AuthenticationResponse, ClientData};
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use p256::ecdsa::{signature::Verifier as _, Signature};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

/// The values an assertion must have been produced for
#[derive(Debug, Clone, Copy)]
pub struct ExpectedAssertion<'a> {
    /// Base64url challenge issued at login start
    pub challenge: &'a str,
    pub origin: &'a Url,
    pub rp_id: &'a str,
}

/// Which check rejected an assertion; for server logs only
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssertionFailure {
    #[error("unsupported credential type '{0}'")]
    CredentialType(String),
    #[error("credential id and rawId differ")]
    InconsistentCredentialId,
    #[error("credential id does not belong to the candidate credential")]
    CredentialIdMismatch,
    #[error("{0} is not valid base64url")]
    Encoding(&'static str),
    #[error("clientDataJSON is not valid JSON")]
    ClientDataJson,
    #[error("unexpected clientData type '{0}'")]
    ClientDataType(String),
    #[error("challenge mismatch")]
    ChallengeMismatch,
    #[error("origin mismatch (expected {expected}, got {got})")]
    OriginMismatch { expected: String, got: String },
    #[error(transparent)]
    AuthenticatorData(#[from] AuthenticatorDataError),
    #[error("rpIdHash mismatch")]
    RpIdHashMismatch,
    #[error("user presence flag not set")]
    UserNotPresent,
    #[error("user verification flag not set")]
    UserNotVerified,
    #[error("stored public key unusable: {0}")]
    PublicKey(#[from] CoseKeyError),
    #[error("signature is neither DER nor raw ECDSA")]
    SignatureEncoding,
    #[error("signature verification failed")]
    BadSignature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertionVerifier {
    /// Off by default: assertions without biometric/PIN verification are
    /// accepted. Turning this on rejects them.
    pub require_user_verification: bool,
}

impl AssertionVerifier {
    pub fn new(require_user_verification: bool) -> Self {
        Self {
            require_user_verification,
        }
    }

    /// Verify and fold any failure into `verified = false`
    pub fn verify(
        &self,
        assertion: &AuthenticationResponse,
        expected: &ExpectedAssertion<'_>,
        candidate: &Candidate<'_>,
    ) -> AssertionResult {
        match self.check(assertion, expected, candidate) {
            Ok(new_counter) => AssertionResult {
                verified: true,
                new_counter,
            },
            Err(failure) => {
                tracing::warn!(
                    credential_id = %candidate.credential.id,
                    reason = %failure,
                    "Assertion rejected"
                );
                AssertionResult {
                    verified: false,
                    new_counter: 0,
                }
            }
        }
    }

    /// Run every check; `Ok` carries the authenticator's signature counter
    pub fn check(
        &self,
        assertion: &AuthenticationResponse,
        expected: &ExpectedAssertion<'_>,
        candidate: &Candidate<'_>,
    ) -> Result<u32, AssertionFailure> {
        if assertion.type_ != "public-key" {
            return Err(AssertionFailure::CredentialType(assertion.type_.clone()));
        }
        if !credential_id::same_credential(&assertion.id, &assertion.raw_id) {
            return Err(AssertionFailure::InconsistentCredentialId);
        }
        if candidate.kind == MatchKind::Exact
            && !credential_id::same_credential(&assertion.id, &candidate.credential.id)
        {
            return Err(AssertionFailure::CredentialIdMismatch);
        }

        let client_data_bytes = decode_b64url(&assertion.response.client_data_json)
            .ok_or(AssertionFailure::Encoding("clientDataJSON"))?;
        let client_data: ClientData = serde_json::from_slice(&client_data_bytes)
            .map_err(|_| AssertionFailure::ClientDataJson)?;

        if client_data.type_ != "webauthn.get" {
            return Err(AssertionFailure::ClientDataType(client_data.type_));
        }
        if !same_challenge(&client_data.challenge, expected.challenge) {
            return Err(AssertionFailure::ChallengeMismatch);
        }
        if !same_origin(expected.origin, &client_data.origin) {
            return Err(AssertionFailure::OriginMismatch {
                expected: expected.origin.origin().ascii_serialization(),
                got: client_data.origin,
            });
        }

        let auth_data_bytes = decode_b64url(&assertion.response.authenticator_data)
            .ok_or(AssertionFailure::Encoding("authenticatorData"))?;
        let auth_data = AuthenticatorData::parse(&auth_data_bytes)?;

        if auth_data.rp_id_hash != rp_id_hash(expected.rp_id) {
            return Err(AssertionFailure::RpIdHashMismatch);
        }
        if !auth_data.user_present() {
            return Err(AssertionFailure::UserNotPresent);
        }
        if self.require_user_verification && !auth_data.user_verified() {
            return Err(AssertionFailure::UserNotVerified);
        }

        let public_key = cose::parse_es256_public_key(&candidate.credential.credential_public_key)?;
        let signature_bytes = decode_b64url(&assertion.response.signature)
            .ok_or(AssertionFailure::Encoding("signature"))?;
        let signature = Signature::from_der(&signature_bytes)
            .or_else(|_| Signature::from_slice(&signature_bytes))
            .map_err(|_| AssertionFailure::SignatureEncoding)?;

        let client_data_hash = Sha256::digest(&client_data_bytes);
        let mut signed = Vec::with_capacity(auth_data_bytes.len() + client_data_hash.len());
        signed.extend_from_slice(&auth_data_bytes);
        signed.extend_from_slice(&client_data_hash);

        public_key
            .verify(&signed, &signature)
            .map_err(|_| AssertionFailure::BadSignature)?;

        Ok(auth_data.sign_count)
    }
}

fn decode_b64url(value: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value)
        .or_else(|_| URL_SAFE.decode(value))
        .ok()
}

/// Compare decoded bytes so padding differences don't matter; fall back to
/// the literal text when either side is not base64url.
fn same_challenge(got: &str, expected: &str) -> bool {
    match (decode_b64url(got), decode_b64url(expected)) {
        (Some(got), Some(expected)) => got == expected,
        _ => got == expected,
    }
}

/// Scheme, host and effective port must agree
fn same_origin(expected: &Url, got: &str) -> bool {
    let Ok(got) = Url::parse(got) else {
        return false;
    };
    expected.scheme() == got.scheme()
        && expected.host_str() == got.host_str()
        && expected.port_or_known_default() == got.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_comparison_normalises_default_ports() {
        let expected = Url::parse("https://todo.example").unwrap();
        assert!(same_origin(&expected, "https://todo.example:443"));
        assert!(same_origin(&expected, "https://todo.example/"));
        assert!(!same_origin(&expected, "http://todo.example"));
        assert!(!same_origin(&expected, "https://evil.example"));
        assert!(!same_origin(&expected, "not an origin"));
    }

    #[test]
    fn challenge_comparison_ignores_padding() {
        assert!(same_challenge("AQI", "AQI="));
        assert!(!same_challenge("AQI", "AQM"));
        assert!(same_challenge("plain text", "plain text"));
    }
}
