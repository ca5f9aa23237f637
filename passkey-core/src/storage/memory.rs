//! In-memory challenge and credential storage
//!
//! Challenges are short-lived and single-use; `DashMap::remove` gives the
//! atomic read-and-delete the challenge contract requires. Everything is lost
//! on restart, so these stores are meant for development and tests.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{ChallengeStore, ConsumedChallenge, CredentialStore, StorageError, StoredCredential};
use crate::encoding::base64url_encode;

/// Challenge entry with expiration
struct ChallengeEntry {
    user_id: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: Instant,
}

/// In-memory storage for pending challenges
#[derive(Default)]
pub struct MemoryChallengeStore {
    /// Pending challenges (base64url challenge -> entry)
    challenges: DashMap<String, ChallengeEntry>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired challenges (called periodically)
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.challenges.retain(|_, entry| entry.expires_at > now);
    }

    /// Number of pending challenges, expired ones included until cleanup
    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn store_challenge(
        &self,
        challenge: &str,
        user_id: Option<&str>,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        self.challenges.insert(
            challenge.to_string(),
            ChallengeEntry {
                user_id: user_id.map(str::to_string),
                created_at: Utc::now(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn consume_challenge(
        &self,
        challenge: &str,
    ) -> Result<Option<ConsumedChallenge>, StorageError> {
        let Some((_, entry)) = self.challenges.remove(challenge) else {
            return Ok(None);
        };
        if entry.expires_at > Instant::now() {
            Ok(Some(ConsumedChallenge {
                user_id: entry.user_id,
                created_at: entry.created_at,
            }))
        } else {
            tracing::debug!("Consumed challenge had expired");
            Ok(None)
        }
    }
}

impl std::fmt::Debug for MemoryChallengeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChallengeStore")
            .field("challenges", &self.challenges.len())
            .finish()
    }
}

/// In-memory credential storage (credential id base64url -> credential)
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: DashMap<String, StoredCredential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        tracing::warn!("Using in-memory credential storage - credentials will be lost on restart!");
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_credential(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<StoredCredential>, StorageError> {
        Ok(self
            .credentials
            .get(&base64url_encode(credential_id))
            .map(|entry| entry.value().clone()))
    }

    async fn insert_credential(&self, credential: StoredCredential) -> Result<(), StorageError> {
        use dashmap::mapref::entry::Entry;

        let key = credential.credential_id_b64();
        match self.credentials.entry(key) {
            Entry::Occupied(entry) => Err(StorageError::Duplicate(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(credential);
                Ok(())
            }
        }
    }

    async fn update_credential(
        &self,
        credential_id: &[u8],
        sign_count: u32,
        backed_up: bool,
    ) -> Result<bool, StorageError> {
        if let Some(mut entry) = self.credentials.get_mut(&base64url_encode(credential_id)) {
            entry.sign_count = sign_count;
            entry.backed_up = backed_up;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("credentials", &self.credentials.len())
            .finish()
    }
}
