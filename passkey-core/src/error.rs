use thiserror::Error;

use crate::storage::StorageError;

/// Errors raised while decoding CBOR.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated input: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Unsupported additional info {info} for major type {major}")]
    UnsupportedAdditionalInfo { major: u8, info: u8 },

    #[error("Indefinite-length items are not supported (major type {0})")]
    IndefiniteLength(u8),

    #[error("16-bit floats are not supported")]
    HalfFloat,

    #[error("Unsupported simple value {0}")]
    UnsupportedSimpleValue(u8),

    #[error("Invalid UTF-8 in text string")]
    InvalidUtf8,

    #[error("Unsupported map key: {0}")]
    UnsupportedMapKey(&'static str),

    #[error("Duplicate map key: {0}")]
    DuplicateMapKey(String),

    #[error("Nesting deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("Length {0} does not fit in memory")]
    LengthOverflow(u64),

    #[error("{0} trailing bytes after CBOR item")]
    TrailingBytes(usize),

    #[error("Malformed structure: {0}")]
    Malformed(String),
}

/// Errors raised by the ceremony pipelines.
///
/// Public verification entry points never return these directly; they are
/// logged and collapsed into a `verified: false` result.
#[derive(Error, Debug)]
pub enum PasskeyError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Client data error: {0}")]
    ClientData(String),

    #[error("Unexpected ceremony type: expected {expected}, got {actual}")]
    CeremonyType {
        expected: &'static str,
        actual: String,
    },

    #[error("Origin not allowed: {0}")]
    Origin(String),

    #[error("Challenge error: {0}")]
    Challenge(String),

    #[error("Relying party id hash mismatch")]
    RpIdHashMismatch,

    #[error("User not present")]
    UserNotPresent,

    #[error("User verification required but not performed")]
    UserNotVerified,

    #[error("Attested credential data missing")]
    MissingAttestedCredentialData,

    #[error("Attested credential data not expected in an assertion")]
    UnexpectedAttestedCredentialData,

    #[error("Attestation error: {0}")]
    Attestation(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(i128),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Credential not found")]
    CredentialNotFound,

    #[error("Credential mismatch: {0}")]
    CredentialMismatch(String),

    #[error("Sign counter did not increase: stored={stored}, received={received}")]
    CloneDetected { stored: u32, received: u32 },

    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Random generator error: {0}")]
    Random(String),
}

impl PasskeyError {
    /// True when the failure suggests a cloned authenticator.
    ///
    /// Callers can use this to trigger credential revocation policy.
    pub fn is_clone_signal(&self) -> bool {
        matches!(self, Self::CloneDetected { .. })
    }
}

impl From<serde_json::Error> for PasskeyError {
    fn from(e: serde_json::Error) -> Self {
        Self::ClientData(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PasskeyError>;
