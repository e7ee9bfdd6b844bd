//! # WebAuthn Module
//!
//! Passkey login for a single relying party.
//!
//! ## Submodules
//! - `types`: Request/response types for the API
//! - `authentication`: the login flow (challenge issue and verification)
//! - `verifier`: cryptographic checks on a signed assertion
//! - `counter`: signature counter anti-replay guard
//! - `matching`: which stored credential an assertion is checked against
//! - `credential_id`, `authenticator_data`, `cose`: wire formats
//!
//! ## Authentication (Logging In)
//! 1. Client requests options → `AuthService::start_authentication()`
//! 2. Server stores a challenge and sets the challenge cookies
//! 3. Client signs the challenge with its authenticator
//! 4. Client posts the assertion → `AuthService::finish_authentication()`
//! 5. Server verifies it against the stored public key and counter
//! 6. If valid, a session is created and the challenge cookies cleared

pub mod authentication;
pub mod authenticator_data;
pub mod cose;
pub mod counter;
pub mod credential_id;
pub mod matching;
pub mod types;
pub mod verifier;
