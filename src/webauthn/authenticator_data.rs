use sha2::{Digest, Sha256};
use thiserror::Error;

pub const FLAG_USER_PRESENT: u8 = 0x01;
pub const FLAG_USER_VERIFIED: u8 = 0x04;
pub const FLAG_BACKUP_ELIGIBLE: u8 = 0x08;
pub const FLAG_BACKUP_STATE: u8 = 0x10;
pub const FLAG_ATTESTED_DATA: u8 = 0x40;
pub const FLAG_EXTENSIONS: u8 = 0x80;

/// rpIdHash (32) + flags (1) + signCount (4)
pub const MIN_LEN: usize = 37;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthenticatorDataError {
    #[error("authenticatorData too short: {0} bytes")]
    TooShort(usize),
}

/// The fixed prefix of an assertion's authenticatorData
///
/// Attested credential data and extensions may follow; a login assertion
/// has no use for them and they are left unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    pub sign_count: u32,
}

impl AuthenticatorData {
    pub fn parse(bytes: &[u8]) -> Result<Self, AuthenticatorDataError> {
        if bytes.len() < MIN_LEN {
            return Err(AuthenticatorDataError::TooShort(bytes.len()));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&bytes[0..32]);

        Ok(Self {
            rp_id_hash,
            flags: bytes[32],
            sign_count: u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]),
        })
    }

    pub fn user_present(&self) -> bool {
        self.flags & FLAG_USER_PRESENT != 0
    }

    pub fn user_verified(&self) -> bool {
        self.flags & FLAG_USER_VERIFIED != 0
    }

    pub fn backup_eligible(&self) -> bool {
        self.flags & FLAG_BACKUP_ELIGIBLE != 0
    }

    pub fn backup_state(&self) -> bool {
        self.flags & FLAG_BACKUP_STATE != 0
    }
}

pub fn rp_id_hash(rp_id: &str) -> [u8; 32] {
    Sha256::digest(rp_id.as_bytes()).into()
}

/// Build assertion authenticatorData (no attested data, no extensions)
pub fn build_assertion_auth_data(rp_id_hash: &[u8; 32], flags: u8, sign_count: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(MIN_LEN);
    data.extend_from_slice(rp_id_hash);
    data.push(flags);
    data.extend_from_slice(&sign_count.to_be_bytes());
    data
}
