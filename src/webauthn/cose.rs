//! COSE_Key handling for ES256 (EC2 / P-256) credential public keys.

use ciborium::value::Value;
use p256::ecdsa::VerifyingKey;
use thiserror::Error;

pub const COSE_KTY_EC2: i128 = 2;
pub const COSE_ALG_ES256: i128 = -7;
pub const COSE_CRV_P256: i128 = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoseKeyError {
    #[error("credential public key is not a CBOR map")]
    Malformed,
    #[error("COSE key missing {0}")]
    Missing(&'static str),
    #[error("unsupported COSE key type {0}")]
    UnsupportedKeyType(i128),
    #[error("unsupported COSE algorithm {0}")]
    UnsupportedAlgorithm(i128),
    #[error("unsupported COSE curve {0}")]
    UnsupportedCurve(i128),
    #[error("public key is not a valid P-256 point")]
    InvalidPoint,
    #[error("COSE key encoding failed: {0}")]
    Encode(String),
}

/// Decode a stored COSE_Key into a P-256 verifying key
///
/// Only kty=2 (EC2), alg=-7 (ES256), crv=1 (P-256) is accepted. An absent
/// `alg` is tolerated; a present one must be ES256.
pub fn parse_es256_public_key(bytes: &[u8]) -> Result<VerifyingKey, CoseKeyError> {
    let value: Value = ciborium::from_reader(bytes).map_err(|_| CoseKeyError::Malformed)?;
    let Value::Map(entries) = value else {
        return Err(CoseKeyError::Malformed);
    };

    let mut kty = None;
    let mut alg = None;
    let mut crv = None;
    let mut x = None;
    let mut y = None;

    for (key, value) in &entries {
        let Value::Integer(label) = key else {
            continue;
        };
        match (i128::from(*label), value) {
            (1, Value::Integer(v)) => kty = Some(i128::from(*v)),
            (3, Value::Integer(v)) => alg = Some(i128::from(*v)),
            (-1, Value::Integer(v)) => crv = Some(i128::from(*v)),
            (-2, Value::Bytes(b)) => x = Some(b.as_slice()),
            (-3, Value::Bytes(b)) => y = Some(b.as_slice()),
            _ => {}
        }
    }

    let kty = kty.ok_or(CoseKeyError::Missing("kty"))?;
    if kty != COSE_KTY_EC2 {
        return Err(CoseKeyError::UnsupportedKeyType(kty));
    }
    if let Some(alg) = alg {
        if alg != COSE_ALG_ES256 {
            return Err(CoseKeyError::UnsupportedAlgorithm(alg));
        }
    }
    let crv = crv.ok_or(CoseKeyError::Missing("crv"))?;
    if crv != COSE_CRV_P256 {
        return Err(CoseKeyError::UnsupportedCurve(crv));
    }
    let x = x.ok_or(CoseKeyError::Missing("x"))?;
    let y = y.ok_or(CoseKeyError::Missing("y"))?;
    if x.len() != 32 || y.len() != 32 {
        return Err(CoseKeyError::InvalidPoint);
    }

    let mut sec1 = Vec::with_capacity(65);
    sec1.push(0x04);
    sec1.extend_from_slice(x);
    sec1.extend_from_slice(y);

    VerifyingKey::from_sec1_bytes(&sec1).map_err(|_| CoseKeyError::InvalidPoint)
}

/// Encode a P-256 public key as a COSE_Key CBOR map (kty=2, alg=-7, crv=1, x, y)
pub fn encode_es256_public_key(key: &VerifyingKey) -> Result<Vec<u8>, CoseKeyError> {
    let point = key.to_encoded_point(false);
    let (Some(x), Some(y)) = (point.x(), point.y()) else {
        return Err(CoseKeyError::InvalidPoint);
    };

    let map = Value::Map(vec![
        (Value::Integer(1i64.into()), Value::Integer(2i64.into())),
        (Value::Integer(3i64.into()), Value::Integer((-7i64).into())),
        (Value::Integer((-1i64).into()), Value::Integer(1i64.into())),
        (Value::Integer((-2i64).into()), Value::Bytes(x.to_vec())),
        (Value::Integer((-3i64).into()), Value::Bytes(y.to_vec())),
    ]);

    let mut buf = Vec::new();
    ciborium::into_writer(&map, &mut buf).map_err(|e| CoseKeyError::Encode(e.to_string()))?;
    Ok(buf)
}
