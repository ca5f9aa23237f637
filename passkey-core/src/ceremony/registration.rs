//! Registration (attestation) verification.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::{credential_id, RelyingParty};
use crate::attestation::{AttestationFormat, AttestationObject, AttestationType};
use crate::authenticator_data::{format_aaguid, AuthenticatorData};
use crate::client_data::{ClientData, TYPE_CREATE};
use crate::crypto::{CoseAlgorithm, CosePublicKey};
use crate::encoding::base64url_decode;
use crate::error::{PasskeyError, Result};
use crate::response::{AuthenticatorTransport, RegistrationResponse};
use crate::storage::{ChallengeStore, DeviceType, StoredCredential};

/// Longest credential id accepted at registration
pub const MAX_CREDENTIAL_ID_LEN: usize = 1023;

/// What a successful registration yields
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationInfo {
    pub credential_id: Vec<u8>,
    /// CBOR-encoded COSE public key, as stored
    pub public_key: Vec<u8>,
    pub algorithm: CoseAlgorithm,
    /// Initial sign counter
    pub sign_count: u32,
    pub aaguid: [u8; 16],
    pub transports: Vec<AuthenticatorTransport>,
    pub device_type: DeviceType,
    pub backed_up: bool,
    pub user_verified: bool,
    pub attestation_format: AttestationFormat,
    pub attestation_type: AttestationType,
    /// User the challenge was issued for
    pub user_id: Option<String>,
    pub origin: String,
    pub rp_id: String,
}

impl RegistrationInfo {
    pub fn aaguid_string(&self) -> String {
        format_aaguid(&self.aaguid)
    }

    /// Build the record to hand to a credential store.
    pub fn into_stored_credential(self, user_id: impl Into<String>) -> StoredCredential {
        StoredCredential {
            credential_id: self.credential_id,
            user_id: user_id.into(),
            public_key: self.public_key,
            algorithm: self.algorithm,
            sign_count: self.sign_count,
            transports: self.transports,
            device_type: self.device_type,
            backed_up: self.backed_up,
            created_at: Utc::now(),
        }
    }
}

/// Public registration outcome. Carries no detail on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationVerification {
    pub verified: bool,
    pub registration_info: Option<RegistrationInfo>,
}

impl RegistrationVerification {
    fn failed() -> Self {
        Self {
            verified: false,
            registration_info: None,
        }
    }
}

impl RelyingParty {
    /// Verify a registration response, collapsing any failure to
    /// `verified: false`.
    pub async fn verify_registration_response<C>(
        &self,
        response: &RegistrationResponse,
        challenges: &C,
    ) -> RegistrationVerification
    where
        C: ChallengeStore + ?Sized,
    {
        match self.verify_registration(response, challenges).await {
            Ok(info) => RegistrationVerification {
                verified: true,
                registration_info: Some(info),
            },
            Err(e) => {
                warn!(error = %e, credential_id = %response.id, "Registration verification failed");
                RegistrationVerification::failed()
            }
        }
    }

    /// Verify a registration response, returning the failure reason.
    ///
    /// The challenge named in the client data is consumed before any other
    /// check, so a failed attempt cannot be retried with the same challenge.
    #[instrument(level = "debug", skip_all, fields(credential_id = %response.id))]
    pub async fn verify_registration<C>(
        &self,
        response: &RegistrationResponse,
        challenges: &C,
    ) -> Result<RegistrationInfo>
    where
        C: ChallengeStore + ?Sized,
    {
        let client_data = ClientData::from_base64url(&response.response.client_data_json)?;
        let challenge = self.consume_challenge(challenges, &client_data).await;

        client_data.require_type(TYPE_CREATE)?;
        client_data.require_origin(self.config.allowed_origins())?;
        let challenge = challenge?;
        debug!(origin = %client_data.collected.origin, "Client data accepted");

        let credential_id = credential_id(&response.credential_type, &response.id, &response.raw_id)?;

        let attestation_bytes = base64url_decode(&response.response.attestation_object)?;
        let attestation = AttestationObject::from_cbor(&attestation_bytes)?;
        let auth_data = AuthenticatorData::parse(&attestation.auth_data)?;

        self.check_rp_id_hash(&auth_data)?;
        self.check_user_flags(auth_data.flags)?;

        let attested = auth_data
            .attested_credential_data
            .as_ref()
            .ok_or(PasskeyError::MissingAttestedCredentialData)?;
        if attested.credential_id.len() > MAX_CREDENTIAL_ID_LEN {
            return Err(PasskeyError::CredentialMismatch(format!(
                "credential id is {} bytes",
                attested.credential_id.len()
            )));
        }
        if attested.credential_id != credential_id {
            return Err(PasskeyError::CredentialMismatch(
                "rawId does not match attested credential id".into(),
            ));
        }

        let public_key = CosePublicKey::from_cbor(&attested.credential_public_key)?;
        let algorithm = public_key.algorithm();
        if !self.config.supported_algorithms.contains(&algorithm) {
            return Err(PasskeyError::UnsupportedAlgorithm(i128::from(algorithm.id())));
        }

        let attestation_type = attestation.verify_statement(&client_data.hash(), &public_key)?;
        debug!(fmt = %attestation.fmt, ?attestation_type, "Attestation statement accepted");

        let info = RegistrationInfo {
            credential_id: attested.credential_id.clone(),
            public_key: attested.credential_public_key.clone(),
            algorithm,
            sign_count: auth_data.sign_count,
            aaguid: attested.aaguid,
            transports: response.response.transports.clone(),
            device_type: DeviceType::from_backup_eligible(auth_data.flags.backup_eligible()),
            backed_up: auth_data.flags.backup_state(),
            user_verified: auth_data.flags.user_verified(),
            attestation_format: attestation.fmt,
            attestation_type,
            user_id: challenge.user_id,
            origin: client_data.collected.origin,
            rp_id: self.config.rp_id.clone(),
        };

        info!(
            aaguid = %info.aaguid_string(),
            fmt = %info.attestation_format,
            algorithm = ?info.algorithm,
            "Passkey registration verified"
        );
        Ok(info)
    }
}
