//! Attestation objects and statement classification
//!
//! The attestation type is reported as metadata only. Whether a given type is
//! acceptable is a policy decision left to the caller.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cbor::{self, CborValue};
use crate::crypto::CosePublicKey;
use crate::error::{PasskeyError, Result};

/// WebAuthn attestation statement format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttestationFormat {
    /// No attestation
    #[default]
    #[serde(rename = "none")]
    None,
    /// Standard packed format
    #[serde(rename = "packed")]
    Packed,
    /// TPM attestation (Windows)
    ///
    /// Only classified when the credential key is ES256 or EdDSA. Windows
    /// Hello normally registers RS256 keys, which are rejected as an
    /// unsupported algorithm before the statement is looked at.
    #[serde(rename = "tpm")]
    Tpm,
    /// Android Key attestation (hardware-backed)
    #[serde(rename = "android-key")]
    AndroidKey,
    /// Android SafetyNet (legacy)
    #[serde(rename = "android-safetynet")]
    AndroidSafetyNet,
    /// Apple anonymous attestation
    #[serde(rename = "apple")]
    Apple,
    /// FIDO U2F
    #[serde(rename = "fido-u2f")]
    FidoU2f,
}

impl AttestationFormat {
    /// Identifier as it appears in the `fmt` field
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Packed => "packed",
            Self::Tpm => "tpm",
            Self::AndroidKey => "android-key",
            Self::AndroidSafetyNet => "android-safetynet",
            Self::Apple => "apple",
            Self::FidoU2f => "fido-u2f",
        }
    }
}

impl FromStr for AttestationFormat {
    type Err = PasskeyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "packed" => Ok(Self::Packed),
            "tpm" => Ok(Self::Tpm),
            "android-key" => Ok(Self::AndroidKey),
            "android-safetynet" => Ok(Self::AndroidSafetyNet),
            "apple" => Ok(Self::Apple),
            "fido-u2f" => Ok(Self::FidoU2f),
            other => Err(PasskeyError::Attestation(format!(
                "unknown attestation format '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for AttestationFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of attestation a statement carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationType {
    None,
    /// Signed by the credential key itself
    SelfAttestation,
    /// Signed by a batch attestation key with a certificate chain
    Basic,
    /// Signed by a key certified by an attestation CA (TPM, Apple)
    AttestationCa,
}

/// Decoded `attestationObject`
#[derive(Debug, Clone)]
pub struct AttestationObject {
    pub fmt: AttestationFormat,
    pub att_stmt: CborValue,
    /// Raw authenticator data, exactly as signed
    pub auth_data: Vec<u8>,
}

impl AttestationObject {
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let value = cbor::decode_all(bytes)?;
        if value.as_map().is_none() {
            return Err(PasskeyError::Attestation(format!(
                "attestation object must be a map, got {}",
                value.kind()
            )));
        }

        let fmt = value
            .get("fmt")
            .and_then(CborValue::as_text)
            .ok_or_else(|| PasskeyError::Attestation("missing fmt".into()))?
            .parse()?;

        let att_stmt = match value.get("attStmt") {
            Some(stmt @ CborValue::Map(_)) => stmt.clone(),
            Some(other) => {
                return Err(PasskeyError::Attestation(format!(
                    "attStmt must be a map, got {}",
                    other.kind()
                )))
            }
            None => return Err(PasskeyError::Attestation("missing attStmt".into())),
        };

        let auth_data = value
            .get("authData")
            .and_then(CborValue::as_bytes)
            .ok_or_else(|| PasskeyError::Attestation("missing authData".into()))?
            .to_vec();

        Ok(Self {
            fmt,
            att_stmt,
            auth_data,
        })
    }

    /// Check the statement and classify it.
    ///
    /// `credential_key` is the key from the attested credential data; it is
    /// used to verify self attestation signatures.
    pub fn verify_statement(
        &self,
        client_data_hash: &[u8; 32],
        credential_key: &CosePublicKey,
    ) -> Result<AttestationType> {
        let stmt = &self.att_stmt;
        let is_empty = stmt.as_map().map(|m| m.is_empty()).unwrap_or(false);

        match self.fmt {
            AttestationFormat::None => {
                if !is_empty {
                    return Err(PasskeyError::Attestation(
                        "none attestation must have an empty statement".into(),
                    ));
                }
                Ok(AttestationType::None)
            }
            AttestationFormat::Packed => {
                let alg = stmt
                    .get("alg")
                    .and_then(CborValue::as_integer)
                    .ok_or_else(|| PasskeyError::Attestation("packed: missing alg".into()))?;
                let sig = require_bytes(stmt, "sig", self.fmt)?;

                if stmt.get("x5c").is_some() {
                    require_certificates(stmt, self.fmt)?;
                    return Ok(AttestationType::Basic);
                }
                if stmt.get("ecdaaKeyId").is_some() {
                    return Err(PasskeyError::Unsupported("ECDAA attestation".into()));
                }

                if alg != i128::from(credential_key.algorithm().id()) {
                    return Err(PasskeyError::Attestation(format!(
                        "packed: alg {alg} does not match credential key"
                    )));
                }
                let mut signed = Vec::with_capacity(self.auth_data.len() + 32);
                signed.extend_from_slice(&self.auth_data);
                signed.extend_from_slice(client_data_hash);
                credential_key.verify(&signed, sig)?;
                Ok(AttestationType::SelfAttestation)
            }
            AttestationFormat::FidoU2f | AttestationFormat::AndroidKey => {
                require_bytes(stmt, "sig", self.fmt)?;
                require_certificates(stmt, self.fmt)?;
                Ok(AttestationType::Basic)
            }
            AttestationFormat::AndroidSafetyNet => {
                stmt.get("ver")
                    .and_then(CborValue::as_text)
                    .ok_or_else(|| PasskeyError::Attestation("android-safetynet: missing ver".into()))?;
                require_bytes(stmt, "response", self.fmt)?;
                Ok(AttestationType::Basic)
            }
            AttestationFormat::Tpm => {
                for field in ["sig", "certInfo", "pubArea"] {
                    require_bytes(stmt, field, self.fmt)?;
                }
                require_certificates(stmt, self.fmt)?;
                Ok(AttestationType::AttestationCa)
            }
            AttestationFormat::Apple => {
                require_certificates(stmt, self.fmt)?;
                Ok(AttestationType::AttestationCa)
            }
        }
    }
}

fn require_bytes<'a>(stmt: &'a CborValue, field: &str, fmt: AttestationFormat) -> Result<&'a [u8]> {
    stmt.get(field)
        .and_then(CborValue::as_bytes)
        .ok_or_else(|| PasskeyError::Attestation(format!("{fmt}: missing {field}")))
}

/// `x5c` must be a non-empty array of DER certificates.
fn require_certificates(stmt: &CborValue, fmt: AttestationFormat) -> Result<()> {
    match stmt.get("x5c").and_then(CborValue::as_array) {
        Some(certs) if !certs.is_empty() && certs.iter().all(|c| c.as_bytes().is_some()) => Ok(()),
        _ => Err(PasskeyError::Attestation(format!(
            "{fmt}: x5c must be a non-empty certificate array"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ed25519_dalek::Signer as _;

    use super::*;
    use crate::error::DecodeError;

    fn stmt(entries: Vec<(&str, CborValue)>) -> CborValue {
        CborValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn object(fmt: AttestationFormat, att_stmt: CborValue) -> AttestationObject {
        AttestationObject {
            fmt,
            att_stmt,
            auth_data: vec![0xAB; 37],
        }
    }

    fn ed25519() -> (ed25519_dalek::SigningKey, CosePublicKey) {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&[3u8; 32]);
        let public = CosePublicKey::EdDsa(signing_key.verifying_key());
        (signing_key, public)
    }

    #[test]
    fn test_format_names() {
        assert_eq!("android-key".parse::<AttestationFormat>().unwrap(), AttestationFormat::AndroidKey);
        assert_eq!(AttestationFormat::FidoU2f.as_str(), "fido-u2f");
        assert_eq!(serde_json::to_string(&AttestationFormat::AndroidSafetyNet).unwrap(), "\"android-safetynet\"");
        assert!(matches!(
            "custom".parse::<AttestationFormat>(),
            Err(PasskeyError::Attestation(_))
        ));
    }

    #[test]
    fn test_none_requires_empty_statement() {
        let (_, key) = ed25519();
        let hash = [0u8; 32];

        let empty = object(AttestationFormat::None, stmt(vec![]));
        assert_eq!(empty.verify_statement(&hash, &key).unwrap(), AttestationType::None);

        let filled = object(AttestationFormat::None, stmt(vec![("sig", CborValue::Bytes(vec![1]))]));
        assert!(filled.verify_statement(&hash, &key).is_err());
    }

    #[test]
    fn test_packed_self_attestation() {
        let (signing_key, key) = ed25519();
        let hash = [9u8; 32];
        let mut signed = vec![0xAB; 37];
        signed.extend_from_slice(&hash);
        let sig = signing_key.sign(&signed).to_bytes().to_vec();

        let good = object(
            AttestationFormat::Packed,
            stmt(vec![("alg", CborValue::Integer(-8)), ("sig", CborValue::Bytes(sig.clone()))]),
        );
        assert_eq!(good.verify_statement(&hash, &key).unwrap(), AttestationType::SelfAttestation);

        // Signature over a different client data hash
        assert!(matches!(
            good.verify_statement(&[0u8; 32], &key),
            Err(PasskeyError::InvalidSignature)
        ));

        let wrong_alg = object(
            AttestationFormat::Packed,
            stmt(vec![("alg", CborValue::Integer(-7)), ("sig", CborValue::Bytes(sig))]),
        );
        assert!(matches!(
            wrong_alg.verify_statement(&hash, &key),
            Err(PasskeyError::Attestation(_))
        ));
    }

    #[test]
    fn test_certificate_formats_are_classified() {
        let (_, key) = ed25519();
        let hash = [0u8; 32];
        let x5c = CborValue::Array(vec![CborValue::Bytes(vec![0x30, 0x82])]);

        let packed = object(
            AttestationFormat::Packed,
            stmt(vec![
                ("alg", CborValue::Integer(-7)),
                ("sig", CborValue::Bytes(vec![1])),
                ("x5c", x5c.clone()),
            ]),
        );
        assert_eq!(packed.verify_statement(&hash, &key).unwrap(), AttestationType::Basic);

        let tpm = object(
            AttestationFormat::Tpm,
            stmt(vec![
                ("alg", CborValue::Integer(-7)),
                ("sig", CborValue::Bytes(vec![1])),
                ("certInfo", CborValue::Bytes(vec![2])),
                ("pubArea", CborValue::Bytes(vec![3])),
                ("x5c", x5c.clone()),
            ]),
        );
        assert_eq!(tpm.verify_statement(&hash, &key).unwrap(), AttestationType::AttestationCa);

        let tpm_without_pub_area = object(
            AttestationFormat::Tpm,
            stmt(vec![
                ("sig", CborValue::Bytes(vec![1])),
                ("certInfo", CborValue::Bytes(vec![2])),
                ("x5c", x5c.clone()),
            ]),
        );
        assert!(tpm_without_pub_area.verify_statement(&hash, &key).is_err());

        let apple = object(AttestationFormat::Apple, stmt(vec![("x5c", x5c)]));
        assert_eq!(apple.verify_statement(&hash, &key).unwrap(), AttestationType::AttestationCa);

        let u2f_without_chain = object(
            AttestationFormat::FidoU2f,
            stmt(vec![("sig", CborValue::Bytes(vec![1]))]),
        );
        assert!(u2f_without_chain.verify_statement(&hash, &key).is_err());
    }

    #[test]
    fn test_attestation_object_from_cbor() {
        // {"fmt": "none", "attStmt": {}, "authData": h'00'}
        let bytes = [
            0xa3, 0x63, b'f', b'm', b't', 0x64, b'n', b'o', b'n', b'e', 0x67, b'a', b't', b't',
            b'S', b't', b'm', b't', 0xa0, 0x68, b'a', b'u', b't', b'h', b'D', b'a', b't', b'a',
            0x41, 0x00,
        ];
        let object = AttestationObject::from_cbor(&bytes).unwrap();
        assert_eq!(object.fmt, AttestationFormat::None);
        assert_eq!(object.auth_data, vec![0x00]);

        // attStmt as an array
        let mut bad = bytes;
        bad[18] = 0x80;
        assert!(AttestationObject::from_cbor(&bad).is_err());
    }

    #[test]
    fn test_repeated_fmt_rejected() {
        // {"fmt": "packed", "fmt": "none", "authData": h'00'}
        let bytes = [
            0xa3, 0x63, b'f', b'm', b't', 0x66, b'p', b'a', b'c', b'k', b'e', b'd', 0x63, b'f',
            b'm', b't', 0x64, b'n', b'o', b'n', b'e', 0x68, b'a', b'u', b't', b'h', b'D', b'a',
            b't', b'a', 0x41, 0x00,
        ];
        let err = AttestationObject::from_cbor(&bytes).unwrap_err();
        assert!(matches!(
            err,
            PasskeyError::Decode(DecodeError::DuplicateMapKey(ref key)) if key == "fmt"
        ));
    }
}
