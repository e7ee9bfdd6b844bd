//! Credential identifier encodings
//!
//! Browsers submit credential ids as unpadded base64url; the credential table
//! stores them as padded standard base64. Comparisons go through the raw
//! bytes, and the canonical text form is unpadded base64url.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;

/// Decode an id written in any base64 flavour, padded or not
pub fn decode(id: &str) -> Option<Vec<u8>> {
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    URL_SAFE_NO_PAD
        .decode(id)
        .or_else(|_| URL_SAFE.decode(id))
        .or_else(|_| STANDARD.decode(id))
        .or_else(|_| STANDARD_NO_PAD.decode(id))
        .ok()
}

/// Canonical (unpadded base64url) form, `None` if the text is not base64
pub fn canonical(id: &str) -> Option<String> {
    decode(id).map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
}

/// Encoding used by the credential table
pub fn to_stored(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Both ids decode and name the same bytes
pub fn same_credential(a: &str, b: &str) -> bool {
    match (decode(a), decode(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
