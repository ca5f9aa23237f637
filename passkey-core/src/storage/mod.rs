//! Storage contracts consumed by the ceremony verifiers.
//!
//! - **Challenges**: short-lived, single-use values. `consume_challenge` must
//!   read and delete atomically so that two racing ceremonies can never both
//!   observe the same challenge as valid.
//! - **Credentials**: registered public keys and their sign counter
//!   watermark, keyed by credential id.
//!
//! Durable backends live with the application; [`MemoryChallengeStore`] and
//! [`MemoryCredentialStore`] are provided for development and tests.

mod memory;

pub use memory::{MemoryChallengeStore, MemoryCredentialStore};

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::CoseAlgorithm;
use crate::encoding::base64url_encode;
use crate::response::AuthenticatorTransport;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

/// What a challenge store hands back when a live challenge is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedChallenge {
    /// User the challenge was issued for, if any.
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Single-use challenge storage.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Persist a base64url-encoded challenge for `ttl`.
    async fn store_challenge(
        &self,
        challenge: &str,
        user_id: Option<&str>,
        ttl: Duration,
    ) -> Result<(), StorageError>;

    /// Atomically remove a challenge and return it if it was still live.
    ///
    /// Returns `None` for unknown, already consumed or expired challenges.
    async fn consume_challenge(
        &self,
        challenge: &str,
    ) -> Result<Option<ConsumedChallenge>, StorageError>;
}

/// Whether a credential can be synced between devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceType {
    SingleDevice,
    MultiDevice,
}

impl DeviceType {
    /// Derived from the backup-eligible flag.
    pub fn from_backup_eligible(backup_eligible: bool) -> Self {
        if backup_eligible {
            Self::MultiDevice
        } else {
            Self::SingleDevice
        }
    }
}

/// A registered credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub credential_id: Vec<u8>,
    pub user_id: String,
    /// CBOR-encoded COSE public key.
    pub public_key: Vec<u8>,
    pub algorithm: CoseAlgorithm,
    /// Highest sign counter seen so far.
    pub sign_count: u32,
    pub transports: Vec<AuthenticatorTransport>,
    pub device_type: DeviceType,
    pub backed_up: bool,
    pub created_at: DateTime<Utc>,
}

impl StoredCredential {
    /// Credential id as used on the wire and as a store key.
    pub fn credential_id_b64(&self) -> String {
        base64url_encode(&self.credential_id)
    }
}

/// Credential storage.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_credential(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<StoredCredential>, StorageError>;

    /// Insert a newly registered credential. Duplicate ids are rejected.
    async fn insert_credential(&self, credential: StoredCredential) -> Result<(), StorageError>;

    /// Record a successful authentication. Returns `false` if the credential
    /// does not exist.
    async fn update_credential(
        &self,
        credential_id: &[u8],
        sign_count: u32,
        backed_up: bool,
    ) -> Result<bool, StorageError>;
}
