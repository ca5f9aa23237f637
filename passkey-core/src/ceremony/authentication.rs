//! Authentication (assertion) verification.

use tracing::{debug, info, instrument, warn};

use super::{credential_id, RelyingParty};
use crate::authenticator_data::AuthenticatorData;
use crate::client_data::{ClientData, TYPE_GET};
use crate::crypto::CosePublicKey;
use crate::encoding::{base64url_decode, base64url_encode};
use crate::error::{PasskeyError, Result};
use crate::response::AuthenticationResponse;
use crate::storage::{ChallengeStore, CredentialStore, DeviceType};

/// What a successful authentication yields. The caller persists
/// `new_counter` and `backed_up` through its credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationInfo {
    pub credential_id: Vec<u8>,
    pub user_id: String,
    pub new_counter: u32,
    pub user_verified: bool,
    pub device_type: DeviceType,
    pub backed_up: bool,
}

/// Public authentication outcome. Carries no detail on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationVerification {
    pub verified: bool,
    pub authentication_info: Option<AuthenticationInfo>,
}

/// Sign counter rule.
///
/// Passes when the received counter is strictly greater than the stored one,
/// or when both are zero (authenticator without a counter).
pub fn check_sign_count(stored: u32, received: u32) -> Result<()> {
    if received > stored || (stored == 0 && received == 0) {
        Ok(())
    } else {
        Err(PasskeyError::CloneDetected { stored, received })
    }
}

impl RelyingParty {
    /// Verify an authentication response, collapsing any failure to
    /// `verified: false`.
    pub async fn verify_authentication_response<C, S>(
        &self,
        response: &AuthenticationResponse,
        challenges: &C,
        credentials: &S,
    ) -> AuthenticationVerification
    where
        C: ChallengeStore + ?Sized,
        S: CredentialStore + ?Sized,
    {
        match self.verify_authentication(response, challenges, credentials).await {
            Ok(info) => AuthenticationVerification {
                verified: true,
                authentication_info: Some(info),
            },
            Err(e) => {
                if e.is_clone_signal() {
                    warn!(error = %e, credential_id = %response.id, "Possible cloned authenticator");
                } else {
                    warn!(error = %e, credential_id = %response.id, "Authentication verification failed");
                }
                AuthenticationVerification {
                    verified: false,
                    authentication_info: None,
                }
            }
        }
    }

    /// Verify an authentication response, returning the failure reason.
    #[instrument(level = "debug", skip_all, fields(credential_id = %response.id))]
    pub async fn verify_authentication<C, S>(
        &self,
        response: &AuthenticationResponse,
        challenges: &C,
        credentials: &S,
    ) -> Result<AuthenticationInfo>
    where
        C: ChallengeStore + ?Sized,
        S: CredentialStore + ?Sized,
    {
        let client_data = ClientData::from_base64url(&response.response.client_data_json)?;
        let challenge = self.consume_challenge(challenges, &client_data).await;

        client_data.require_type(TYPE_GET)?;
        client_data.require_origin(self.config.allowed_origins())?;
        let challenge = challenge?;

        let credential_id = credential_id(&response.credential_type, &response.id, &response.raw_id)?;

        let raw_auth_data = base64url_decode(&response.response.authenticator_data)?;
        let auth_data = AuthenticatorData::parse(&raw_auth_data)?;

        self.check_rp_id_hash(&auth_data)?;
        self.check_user_flags(auth_data.flags)?;
        if auth_data.flags.attested_credential_data() {
            return Err(PasskeyError::UnexpectedAttestedCredentialData);
        }

        let stored = credentials
            .get_credential(&credential_id)
            .await?
            .ok_or(PasskeyError::CredentialNotFound)?;

        if let Some(expected_user) = challenge.user_id.as_deref() {
            if expected_user != stored.user_id {
                return Err(PasskeyError::CredentialMismatch(
                    "credential belongs to a different user".into(),
                ));
            }
        }
        if let Some(handle) = response.response.user_handle.as_deref().filter(|h| !h.is_empty()) {
            if base64url_decode(handle)? != stored.user_id.as_bytes() {
                return Err(PasskeyError::CredentialMismatch(
                    "userHandle does not match credential owner".into(),
                ));
            }
        }

        let public_key = CosePublicKey::from_cbor(&stored.public_key)?;
        let signature = base64url_decode(&response.response.signature)?;
        let mut signed = raw_auth_data;
        signed.extend_from_slice(&client_data.hash());
        public_key.verify(&signed, &signature)?;
        debug!(algorithm = ?public_key.algorithm(), "Assertion signature verified");

        check_sign_count(stored.sign_count, auth_data.sign_count)?;

        info!(
            credential_id = %base64url_encode(&credential_id),
            user = %stored.user_id,
            counter = auth_data.sign_count,
            "Passkey authentication verified"
        );

        Ok(AuthenticationInfo {
            credential_id,
            user_id: stored.user_id,
            new_counter: auth_data.sign_count,
            user_verified: auth_data.flags.user_verified(),
            device_type: DeviceType::from_backup_eligible(auth_data.flags.backup_eligible()),
            backed_up: auth_data.flags.backup_state(),
        })
    }
}
