#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use parking_lot::Mutex;
use passkey_todo_server::config::{RelyingParty, VerifierPolicy};
use passkey_todo_server::db::memory::MemoryStore;
use passkey_todo_server::db::models::{PasskeyCredential, User};
use passkey_todo_server::error::AppResult;
use passkey_todo_server::session::{SessionIssuer, SessionToken};
use passkey_todo_server::webauthn::authentication::AuthService;
use passkey_todo_server::webauthn::authenticator_data::{
    build_assertion_auth_data, rp_id_hash, FLAG_USER_PRESENT, FLAG_USER_VERIFIED,
};
use passkey_todo_server::webauthn::cose::encode_es256_public_key;
use passkey_todo_server::webauthn::credential_id;
use passkey_todo_server::webauthn::types::{
    AuthenticationResponse, AuthenticatorAssertionResponse, ChallengeCookies,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use url::Url;

pub const RP_ID: &str = "todo.example";
pub const ORIGIN: &str = "https://todo.example";

pub fn relying_party() -> RelyingParty {
    RelyingParty {
        id: RP_ID.to_string(),
        origin: Url::parse(ORIGIN).unwrap(),
        name: "Todo".to_string(),
    }
}

/// A P-256 passkey held in memory
pub struct SoftAuthenticator {
    key: SigningKey,
    credential_id: Vec<u8>,
}

/// What goes into one signed assertion
#[derive(Debug, Clone)]
pub struct Sign {
    pub challenge: String,
    pub counter: u32,
    pub origin: String,
    pub rp_id: String,
    pub flags: u8,
    pub client_type: String,
}

impl Sign {
    pub fn new(challenge: &str, counter: u32) -> Self {
        Self {
            challenge: challenge.to_string(),
            counter,
            origin: ORIGIN.to_string(),
            rp_id: RP_ID.to_string(),
            flags: FLAG_USER_PRESENT | FLAG_USER_VERIFIED,
            client_type: "webauthn.get".to_string(),
        }
    }
}

impl SoftAuthenticator {
    pub fn new(seed: u8, credential_id: &[u8]) -> Self {
        Self {
            key: SigningKey::from_slice(&[seed; 32]).unwrap(),
            credential_id: credential_id.to_vec(),
        }
    }

    /// Id as the database stores it
    pub fn stored_id(&self) -> String {
        credential_id::to_stored(&self.credential_id)
    }

    /// Id as the browser submits it
    pub fn submitted_id(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.credential_id)
    }

    pub fn credential(&self, user_id: &str, counter: u32) -> PasskeyCredential {
        let public_key = encode_es256_public_key(self.key.verifying_key()).unwrap();
        PasskeyCredential::new(self.stored_id(), user_id.to_string(), public_key, counter)
    }

    pub fn sign(&self, params: &Sign) -> AuthenticationResponse {
        let client_data = serde_json::json!({
            "type": params.client_type,
            "challenge": params.challenge,
            "origin": params.origin,
            "crossOrigin": false,
        });
        let client_data_json = serde_json::to_vec(&client_data).unwrap();
        let auth_data =
            build_assertion_auth_data(&rp_id_hash(&params.rp_id), params.flags, params.counter);

        let mut signed = auth_data.clone();
        signed.extend_from_slice(&Sha256::digest(&client_data_json));
        let signature: Signature = self.key.sign(&signed);

        AuthenticationResponse {
            id: self.submitted_id(),
            raw_id: self.submitted_id(),
            type_: "public-key".to_string(),
            response: AuthenticatorAssertionResponse {
                client_data_json: URL_SAFE_NO_PAD.encode(&client_data_json),
                authenticator_data: URL_SAFE_NO_PAD.encode(&auth_data),
                signature: URL_SAFE_NO_PAD.encode(signature.to_der().as_bytes()),
                user_handle: None,
            },
            authenticator_attachment: Some("platform".to_string()),
            client_extension_results: serde_json::json!({}),
        }
    }
}

/// Records the sessions it hands out
#[derive(Default)]
pub struct RecordingSessions {
    pub issued: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SessionIssuer for RecordingSessions {
    async fn create_session(&self, user_id: &str, username: &str) -> AppResult<SessionToken> {
        let mut issued = self.issued.lock();
        issued.push((user_id.to_string(), username.to_string()));
        Ok(SessionToken(format!("session-{}", issued.len())))
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub service: AuthService,
    pub sessions: RecordingSessions,
    pub user: User,
}

impl Fixture {
    pub fn new(policy: VerifierPolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        let user = User::new("alice".to_string(), "Alice".to_string());
        store.insert_user(user.clone());

        let service = AuthService::new(
            store.clone(),
            relying_party(),
            policy,
            chrono::Duration::minutes(5),
        );

        Self {
            store,
            service,
            sessions: RecordingSessions::default(),
            user,
        }
    }

    pub fn register(&self, authenticator: &SoftAuthenticator, counter: u32) {
        self.store
            .insert_credential(authenticator.credential(&self.user.id, counter));
    }

    /// Run login-options for alice and return the cookies the browser would hold
    pub async fn begin(&self) -> ChallengeCookies {
        let (_, challenge) = self
            .service
            .start_authentication(&self.user.username)
            .await
            .unwrap();
        ChallengeCookies {
            challenge: Some(challenge.challenge),
            username: Some(challenge.username),
        }
    }
}
