//! Digests, COSE public keys and assertion signature verification.

use ed25519_dalek::Verifier as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cbor::{self, CborValue};
use crate::error::{PasskeyError, Result};

// COSE key parameters (RFC 9052 / RFC 9053).
const COSE_KTY: &str = "1";
const COSE_ALG: &str = "3";
const COSE_CRV: &str = "-1";
const COSE_X: &str = "-2";
const COSE_Y: &str = "-3";

const KTY_OKP: i128 = 1;
const KTY_EC2: i128 = 2;
const CRV_P256: i128 = 1;
const CRV_ED25519: i128 = 6;

/// SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// COSE signature algorithms this engine can verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum CoseAlgorithm {
    /// ECDSA over P-256 with SHA-256.
    Es256,
    /// Ed25519.
    EdDsa,
}

impl CoseAlgorithm {
    pub const fn id(self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::EdDsa => -8,
        }
    }

    pub fn from_id(id: i128) -> Option<Self> {
        match id {
            -7 => Some(Self::Es256),
            -8 => Some(Self::EdDsa),
            _ => None,
        }
    }
}

impl From<CoseAlgorithm> for i64 {
    fn from(alg: CoseAlgorithm) -> i64 {
        alg.id()
    }
}

impl TryFrom<i64> for CoseAlgorithm {
    type Error = String;

    fn try_from(id: i64) -> std::result::Result<Self, Self::Error> {
        Self::from_id(i128::from(id)).ok_or_else(|| format!("unsupported COSE algorithm {id}"))
    }
}

/// A credential public key decoded from its COSE encoding.
#[derive(Debug, Clone)]
pub enum CosePublicKey {
    Es256(p256::ecdsa::VerifyingKey),
    EdDsa(ed25519_dalek::VerifyingKey),
}

impl CosePublicKey {
    /// Decode a CBOR-encoded COSE key.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let value = cbor::decode_all(bytes)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &CborValue) -> Result<Self> {
        if value.as_map().is_none() {
            return Err(PasskeyError::InvalidPublicKey(format!(
                "COSE key must be a map, got {}",
                value.kind()
            )));
        }

        let kty = int_param(value, COSE_KTY, "kty")?;
        let alg_id = int_param(value, COSE_ALG, "alg")?;
        let alg = CoseAlgorithm::from_id(alg_id).ok_or(PasskeyError::UnsupportedAlgorithm(alg_id))?;

        match alg {
            CoseAlgorithm::Es256 => {
                expect_param(kty, KTY_EC2, "kty")?;
                expect_param(int_param(value, COSE_CRV, "crv")?, CRV_P256, "crv")?;
                let x = coordinate(value, COSE_X, "x")?;
                let y = coordinate(value, COSE_Y, "y")?;

                let mut sec1 = Vec::with_capacity(65);
                sec1.push(0x04);
                sec1.extend_from_slice(x);
                sec1.extend_from_slice(y);

                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| PasskeyError::InvalidPublicKey("point not on P-256".into()))?;
                Ok(Self::Es256(key))
            }
            CoseAlgorithm::EdDsa => {
                expect_param(kty, KTY_OKP, "kty")?;
                expect_param(int_param(value, COSE_CRV, "crv")?, CRV_ED25519, "crv")?;
                let x: [u8; 32] = coordinate(value, COSE_X, "x")?
                    .try_into()
                    .map_err(|_| PasskeyError::InvalidPublicKey("x must be 32 bytes".into()))?;

                let key = ed25519_dalek::VerifyingKey::from_bytes(&x)
                    .map_err(|_| PasskeyError::InvalidPublicKey("invalid Ed25519 point".into()))?;
                Ok(Self::EdDsa(key))
            }
        }
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            Self::Es256(_) => CoseAlgorithm::Es256,
            Self::EdDsa(_) => CoseAlgorithm::EdDsa,
        }
    }

    /// Verify `signature` over `message`.
    ///
    /// ES256 signatures arrive DER-encoded; Ed25519 signatures are 64 raw bytes.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            Self::Es256(key) => {
                let sig = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|_| PasskeyError::InvalidSignature)?;
                key.verify(message, &sig)
                    .map_err(|_| PasskeyError::InvalidSignature)
            }
            Self::EdDsa(key) => {
                let sig = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|_| PasskeyError::InvalidSignature)?;
                key.verify(message, &sig)
                    .map_err(|_| PasskeyError::InvalidSignature)
            }
        }
    }
}

fn int_param(value: &CborValue, key: &str, name: &str) -> Result<i128> {
    value
        .get(key)
        .and_then(CborValue::as_integer)
        .ok_or_else(|| PasskeyError::InvalidPublicKey(format!("missing or invalid {name}")))
}

fn expect_param(actual: i128, expected: i128, name: &str) -> Result<()> {
    if actual != expected {
        return Err(PasskeyError::InvalidPublicKey(format!(
            "unexpected {name} {actual}, expected {expected}"
        )));
    }
    Ok(())
}

fn coordinate<'a>(value: &'a CborValue, key: &str, name: &str) -> Result<&'a [u8]> {
    match value.get(key).and_then(CborValue::as_bytes) {
        Some(b) if b.len() == 32 => Ok(b),
        _ => Err(PasskeyError::InvalidPublicKey(format!(
            "{name} must be a 32-byte string"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciborium::value::Value;
    use ed25519_dalek::Signer as _;

    fn encode(value: &Value) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::into_writer(value, &mut out).unwrap();
        out
    }

    fn okp_key(x: &[u8]) -> Vec<u8> {
        encode(&Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(1.into())),
            (Value::Integer(3.into()), Value::Integer((-8).into())),
            (Value::Integer((-1).into()), Value::Integer(6.into())),
            (Value::Integer((-2).into()), Value::Bytes(x.to_vec())),
        ]))
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"localhost")),
            "49960de5880e8c687434170f6476605b8fe4aeb9a28632c7995cf3ba831d9763"
        );
    }

    #[test]
    fn test_algorithm_ids() {
        assert_eq!(CoseAlgorithm::Es256.id(), -7);
        assert_eq!(CoseAlgorithm::from_id(-8), Some(CoseAlgorithm::EdDsa));
        assert_eq!(CoseAlgorithm::from_id(-257), None);
        assert_eq!(serde_json::to_string(&CoseAlgorithm::Es256).unwrap(), "-7");
    }

    #[test]
    fn test_ed25519_key_and_signature() {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        let cose = okp_key(signing_key.verifying_key().as_bytes());

        let key = CosePublicKey::from_cbor(&cose).unwrap();
        assert_eq!(key.algorithm(), CoseAlgorithm::EdDsa);

        let signature = signing_key.sign(b"message");
        assert!(key.verify(b"message", &signature.to_bytes()).is_ok());
        assert!(matches!(
            key.verify(b"other message", &signature.to_bytes()),
            Err(PasskeyError::InvalidSignature)
        ));
        assert!(matches!(
            key.verify(b"message", &[0u8; 10]),
            Err(PasskeyError::InvalidSignature)
        ));
    }

    #[test]
    fn test_unsupported_algorithm() {
        let cose = encode(&Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(3.into())),
            (Value::Integer(3.into()), Value::Integer((-257).into())),
        ]));
        assert!(matches!(
            CosePublicKey::from_cbor(&cose),
            Err(PasskeyError::UnsupportedAlgorithm(-257))
        ));
    }

    #[test]
    fn test_es256_requires_coordinates() {
        // {kty: 2, alg: -7} without curve or coordinates
        let cose = [0xa2, 0x01, 0x02, 0x03, 0x26];
        assert!(matches!(
            CosePublicKey::from_cbor(&cose),
            Err(PasskeyError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_es256_rejects_point_off_curve() {
        let cose = encode(&Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(2.into())),
            (Value::Integer(3.into()), Value::Integer((-7).into())),
            (Value::Integer((-1).into()), Value::Integer(1.into())),
            (Value::Integer((-2).into()), Value::Bytes(vec![1; 32])),
            (Value::Integer((-3).into()), Value::Bytes(vec![2; 32])),
        ]));
        assert!(matches!(
            CosePublicKey::from_cbor(&cose),
            Err(PasskeyError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_key_type_mismatch() {
        // EdDSA algorithm with an EC2 key type
        let cose = encode(&Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(2.into())),
            (Value::Integer(3.into()), Value::Integer((-8).into())),
        ]));
        assert!(matches!(
            CosePublicKey::from_cbor(&cose),
            Err(PasskeyError::InvalidPublicKey(_))
        ));
    }
}
