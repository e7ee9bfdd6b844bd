//! # WebAuthn API Types
//!
//! Request/response shapes for the login endpoints, matching the JSON the
//! browser helper library produces, plus the small value types the login
//! core passes around.

use serde::{Deserialize, Serialize};

/// Name of the cookie carrying the issued challenge
pub const CHALLENGE_COOKIE: &str = "auth-challenge";

/// Name of the cookie carrying the username the challenge was issued for
pub const USERNAME_COOKIE: &str = "auth-username";

/// Request to start passkey login
///
/// ## Example JSON
/// ```json
/// { "username": "alice" }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginOptionsRequest {
    pub username: String,
}

/// Options handed to `navigator.credentials.get()`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// Base64url challenge
    pub challenge: String,
    pub timeout: u32,
    pub rp_id: String,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub type_: String,
    /// Base64url credential id
    pub id: String,
}

/// Signed assertion posted by the client (`AuthenticationResponseJSON`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    /// Base64url credential id
    pub id: String,
    /// Same id as `id`; browsers send both
    pub raw_id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub response: AuthenticatorAssertionResponse,
    #[serde(default)]
    pub authenticator_attachment: Option<String>,
    #[serde(default)]
    pub client_extension_results: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatorAssertionResponse {
    /// Base64url of the raw clientDataJSON bytes
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    /// Base64url authenticatorData
    #[serde(rename = "authenticatorData")]
    pub authenticator_data: String,
    /// Base64url ECDSA signature (DER)
    pub signature: String,
    #[serde(rename = "userHandle", default)]
    pub user_handle: Option<String>,
}

/// The decoded clientDataJSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientData {
    #[serde(rename = "type")]
    pub type_: String,
    pub challenge: String,
    pub origin: String,
    #[serde(default)]
    pub cross_origin: Option<bool>,
}

/// Outcome of one assertion check; never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertionResult {
    pub verified: bool,
    /// Signature counter reported by the authenticator
    pub new_counter: u32,
}

/// The two challenge-scoped values the browser sends back as cookies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeCookies {
    pub challenge: Option<String>,
    pub username: Option<String>,
}

impl ChallengeCookies {
    /// Both values, if both are present and non-empty
    pub fn pair(&self) -> Option<(&str, &str)> {
        let challenge = self.challenge.as_deref().filter(|c| !c.is_empty())?;
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        Some((challenge, username))
    }
}

/// A successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSuccess {
    pub user_id: String,
    pub username: String,
    pub session: crate::session::SessionToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_json_uses_browser_field_names() {
        let json = serde_json::json!({
            "id": "AQID",
            "rawId": "AQID",
            "type": "public-key",
            "response": {
                "clientDataJSON": "e30",
                "authenticatorData": "AA",
                "signature": "AA",
                "userHandle": null
            },
            "clientExtensionResults": {}
        });
        let parsed: AuthenticationResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.raw_id, "AQID");
        assert_eq!(parsed.response.client_data_json, "e30");
        assert!(parsed.response.user_handle.is_none());
        assert!(parsed.authenticator_attachment.is_none());
    }

    #[test]
    fn cookie_pair_requires_both_values() {
        let both = ChallengeCookies {
            challenge: Some("c".into()),
            username: Some("alice".into()),
        };
        assert_eq!(both.pair(), Some(("c", "alice")));

        let missing = ChallengeCookies {
            challenge: None,
            username: Some("alice".into()),
        };
        assert_eq!(missing.pair(), None);

        let empty = ChallengeCookies {
            challenge: Some(String::new()),
            username: Some("alice".into()),
        };
        assert_eq!(empty.pair(), None);
    }

    #[test]
    fn request_options_serialize_camel_case() {
        let options = RequestOptions {
            challenge: "abc".into(),
            timeout: 60_000,
            rp_id: "localhost".into(),
            allow_credentials: vec![],
            user_verification: "preferred".into(),
        };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["rpId"], "localhost");
        assert_eq!(value["userVerification"], "preferred");
        assert!(value["allowCredentials"].as_array().unwrap().is_empty());
    }
}
