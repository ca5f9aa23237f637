//! Authenticator data parsing.
//!
//! Layout:
//!
//! | bytes    | field                                             |
//! |----------|---------------------------------------------------|
//! | 0..32    | SHA-256 of the relying party id                   |
//! | 32       | flags                                             |
//! | 33..37   | sign counter (big-endian u32)                     |
//! | 37..     | attested credential data (if AT), then extensions |

use serde::{Deserialize, Serialize};

use crate::cbor::{self, CborValue};
use crate::error::DecodeError;

/// Size of the fixed header.
pub const AUTHENTICATOR_DATA_MIN_LEN: usize = 37;

const AAGUID_LEN: usize = 16;

/// Authenticator data flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorFlags(pub u8);

impl AuthenticatorFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const BACKUP_ELIGIBLE: u8 = 0x08;
    pub const BACKUP_STATE: u8 = 0x10;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;

    pub fn user_present(self) -> bool {
        self.0 & Self::USER_PRESENT != 0
    }

    pub fn user_verified(self) -> bool {
        self.0 & Self::USER_VERIFIED != 0
    }

    pub fn backup_eligible(self) -> bool {
        self.0 & Self::BACKUP_ELIGIBLE != 0
    }

    pub fn backup_state(self) -> bool {
        self.0 & Self::BACKUP_STATE != 0
    }

    pub fn attested_credential_data(self) -> bool {
        self.0 & Self::ATTESTED_CREDENTIAL_DATA != 0
    }

    pub fn extension_data(self) -> bool {
        self.0 & Self::EXTENSION_DATA != 0
    }
}

/// Credential material present in registration authenticator data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id: Vec<u8>,
    /// Raw CBOR encoding of the COSE public key, exactly as transmitted.
    pub credential_public_key: Vec<u8>,
}

impl AttestedCredentialData {
    /// AAGUID in the canonical 8-4-4-4-12 hex form.
    pub fn aaguid_string(&self) -> String {
        format_aaguid(&self.aaguid)
    }
}

/// Parsed authenticator data.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: AuthenticatorFlags,
    pub sign_count: u32,
    pub attested_credential_data: Option<AttestedCredentialData>,
    pub extensions: Option<CborValue>,
}

impl AuthenticatorData {
    /// Parse raw authenticator data bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < AUTHENTICATOR_DATA_MIN_LEN {
            return Err(DecodeError::Truncated {
                offset: 0,
                needed: AUTHENTICATOR_DATA_MIN_LEN,
                available: bytes.len(),
            });
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&bytes[0..32]);
        let flags = AuthenticatorFlags(bytes[32]);
        let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);

        let mut pos = AUTHENTICATOR_DATA_MIN_LEN;

        let attested_credential_data = if flags.attested_credential_data() {
            let aaguid_bytes = slice(bytes, pos, AAGUID_LEN)?;
            let mut aaguid = [0u8; AAGUID_LEN];
            aaguid.copy_from_slice(aaguid_bytes);
            pos += AAGUID_LEN;

            let len_bytes = slice(bytes, pos, 2)?;
            let id_len = usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]]));
            pos += 2;

            let credential_id = slice(bytes, pos, id_len)?.to_vec();
            pos += id_len;

            let (_, key_len) = cbor::decode(&bytes[pos..])?;
            let credential_public_key = bytes[pos..pos + key_len].to_vec();
            pos += key_len;

            Some(AttestedCredentialData {
                aaguid,
                credential_id,
                credential_public_key,
            })
        } else {
            None
        };

        let extensions = if flags.extension_data() {
            let value = cbor::decode_all(&bytes[pos..])?;
            if !matches!(value, CborValue::Map(_)) {
                return Err(DecodeError::Malformed(format!(
                    "extensions must be a map, got {}",
                    value.kind()
                )));
            }
            pos = bytes.len();
            Some(value)
        } else {
            None
        };

        if pos != bytes.len() {
            return Err(DecodeError::TrailingBytes(bytes.len() - pos));
        }

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
            extensions,
        })
    }
}

fn slice(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], DecodeError> {
    let available = bytes.len().saturating_sub(offset);
    if len > available {
        return Err(DecodeError::Truncated {
            offset,
            needed: len,
            available,
        });
    }
    Ok(&bytes[offset..offset + len])
}

/// Render a 16-byte AAGUID as a UUID string.
pub fn format_aaguid(aaguid: &[u8; 16]) -> String {
    let h = hex::encode(aaguid);
    format!(
        "{}-{}-{}-{}-{}",
        &h[0..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    )
}
