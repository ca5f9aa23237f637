//! Registration and authentication ceremonies
//!
//! [`RelyingParty`] is stateless apart from its configuration. Every call
//! addresses the challenge and credential stores by a unique key, so any
//! number of ceremonies can run concurrently.
//!
//! Each verifier comes in two flavours:
//! - `verify_*` returns the typed failure reason, for server-side decisions
//!   such as revoking a credential on [`PasskeyError::CloneDetected`].
//! - `verify_*_response` logs the reason and returns a uniform
//!   `verified: false`, so responses never reveal which check failed.

mod authentication;
mod options;
mod registration;

pub use authentication::{check_sign_count, AuthenticationInfo, AuthenticationVerification};
pub use options::{
    AuthenticationOptions, AuthenticatorSelection, PublicKeyCredentialDescriptor,
    PublicKeyCredentialParameters, RegistrationOptions, RelyingPartyEntity, UserEntity,
};
pub use registration::{RegistrationInfo, RegistrationVerification, MAX_CREDENTIAL_ID_LEN};

use crate::authenticator_data::{AuthenticatorData, AuthenticatorFlags};
use crate::client_data::ClientData;
use crate::config::RelyingPartyConfig;
use crate::crypto::sha256;
use crate::encoding::base64url_decode;
use crate::error::{PasskeyError, Result};
use crate::response::PUBLIC_KEY_CREDENTIAL_TYPE;
use crate::storage::{ChallengeStore, ConsumedChallenge};

/// Ceremony verifier bound to one Relying Party configuration
#[derive(Debug, Clone)]
pub struct RelyingParty {
    config: RelyingPartyConfig,
    rp_id_hash: [u8; 32],
}

impl RelyingParty {
    pub fn new(config: RelyingPartyConfig) -> Self {
        let rp_id_hash = sha256(config.rp_id.as_bytes());
        Self { config, rp_id_hash }
    }

    pub fn config(&self) -> &RelyingPartyConfig {
        &self.config
    }

    /// SHA-256 of the configured RP ID
    pub fn rp_id_hash(&self) -> &[u8; 32] {
        &self.rp_id_hash
    }

    /// Take the challenge named in the client data out of the store.
    async fn consume_challenge<C>(
        &self,
        challenges: &C,
        client_data: &ClientData,
    ) -> Result<ConsumedChallenge>
    where
        C: ChallengeStore + ?Sized,
    {
        challenges
            .consume_challenge(&client_data.collected.challenge)
            .await?
            .ok_or_else(|| PasskeyError::Challenge("unknown, expired or already used".into()))
    }

    fn check_rp_id_hash(&self, auth_data: &AuthenticatorData) -> Result<()> {
        if auth_data.rp_id_hash != self.rp_id_hash {
            return Err(PasskeyError::RpIdHashMismatch);
        }
        Ok(())
    }

    fn check_user_flags(&self, flags: AuthenticatorFlags) -> Result<()> {
        if !flags.user_present() {
            return Err(PasskeyError::UserNotPresent);
        }
        if self.config.requires_user_verification() && !flags.user_verified() {
            return Err(PasskeyError::UserNotVerified);
        }
        Ok(())
    }
}

/// Check `type`, then decode `rawId` and make sure `id` names the same bytes.
fn credential_id(credential_type: &str, id: &str, raw_id: &str) -> Result<Vec<u8>> {
    if credential_type != PUBLIC_KEY_CREDENTIAL_TYPE {
        return Err(PasskeyError::CredentialMismatch(format!(
            "unexpected credential type '{credential_type}'"
        )));
    }
    let raw = base64url_decode(raw_id)?;
    if base64url_decode(id)? != raw {
        return Err(PasskeyError::CredentialMismatch("id and rawId differ".into()));
    }
    Ok(raw)
}
