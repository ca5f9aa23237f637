//! Options handed to `navigator.credentials.create()` / `.get()`.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::RelyingParty;
use crate::challenge::generate_challenge;
use crate::config::{AttestationConveyance, ResidentKeyRequirement, UserVerificationRequirement};
use crate::encoding::base64url_encode;
use crate::error::Result;
use crate::response::{AuthenticatorTransport, PUBLIC_KEY_CREDENTIAL_TYPE};
use crate::storage::{ChallengeStore, StoredCredential};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingPartyEntity {
    pub id: String,
    pub name: String,
}

/// User account the credential is created for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// base64url of the user id bytes; returned later as `userHandle`
    pub id: String,
    pub name: String,
    pub display_name: String,
}

impl UserEntity {
    pub fn new(user_id: &str, name: &str, display_name: &str) -> Self {
        Self {
            id: base64url_encode(user_id.as_bytes()),
            name: name.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialParameters {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub alg: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialDescriptor {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<AuthenticatorTransport>,
}

impl From<&StoredCredential> for PublicKeyCredentialDescriptor {
    fn from(credential: &StoredCredential) -> Self {
        Self {
            credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            id: credential.credential_id_b64(),
            transports: credential.transports.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub resident_key: ResidentKeyRequirement,
    pub require_resident_key: bool,
    pub user_verification: UserVerificationRequirement,
}

/// `PublicKeyCredentialCreationOptions` in JSON form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub challenge: String,
    pub rp: RelyingPartyEntity,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>,
    pub timeout: u32,
    #[serde(default)]
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
    pub attestation: AttestationConveyance,
}

/// `PublicKeyCredentialRequestOptions` in JSON form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub challenge: String,
    pub rp_id: String,
    pub timeout: u32,
    #[serde(default)]
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>,
    pub user_verification: UserVerificationRequirement,
}

impl RelyingParty {
    /// Issue a registration challenge for `user` and build creation options.
    ///
    /// `exclude` lists credentials the user already owns so the authenticator
    /// does not create a second one.
    #[instrument(level = "debug", skip_all, fields(user = %user_id))]
    pub async fn generate_registration_options<C>(
        &self,
        challenges: &C,
        user_id: &str,
        user_name: &str,
        display_name: &str,
        exclude: &[StoredCredential],
    ) -> Result<RegistrationOptions>
    where
        C: ChallengeStore + ?Sized,
    {
        let challenge = generate_challenge()?;
        challenges
            .store_challenge(&challenge, Some(user_id), self.config.challenge_ttl)
            .await?;
        debug!(excluded = exclude.len(), "Registration challenge stored");

        let resident_key = self.config.resident_key;
        Ok(RegistrationOptions {
            challenge,
            rp: RelyingPartyEntity {
                id: self.config.rp_id.clone(),
                name: self.config.rp_name.clone(),
            },
            user: UserEntity::new(user_id, user_name, display_name),
            pub_key_cred_params: self
                .config
                .supported_algorithms
                .iter()
                .map(|alg| PublicKeyCredentialParameters {
                    credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
                    alg: alg.id(),
                })
                .collect(),
            timeout: self.config.timeout_ms,
            exclude_credentials: exclude.iter().map(Into::into).collect(),
            authenticator_selection: AuthenticatorSelection {
                resident_key,
                require_resident_key: resident_key == ResidentKeyRequirement::Required,
                user_verification: self.config.user_verification,
            },
            attestation: self.config.attestation,
        })
    }

    /// Issue an authentication challenge.
    ///
    /// With `user_id` the challenge is bound to that user and only their
    /// credentials may answer it. Without it (discoverable credential flow)
    /// any registered credential may.
    #[instrument(level = "debug", skip_all, fields(user = ?user_id))]
    pub async fn generate_authentication_options<C>(
        &self,
        challenges: &C,
        user_id: Option<&str>,
        allow: &[StoredCredential],
    ) -> Result<AuthenticationOptions>
    where
        C: ChallengeStore + ?Sized,
    {
        let challenge = generate_challenge()?;
        challenges
            .store_challenge(&challenge, user_id, self.config.challenge_ttl)
            .await?;
        debug!(allowed = allow.len(), "Authentication challenge stored");

        Ok(AuthenticationOptions {
            challenge,
            rp_id: self.config.rp_id.clone(),
            timeout: self.config.timeout_ms,
            allow_credentials: allow.iter().map(Into::into).collect(),
            user_verification: self.config.user_verification,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::config::RelyingPartyConfig;
    use crate::crypto::CoseAlgorithm;
    use crate::storage::{DeviceType, MemoryChallengeStore};

    fn relying_party() -> RelyingParty {
        let config = RelyingPartyConfig::new("app.example", "Example App")
            .unwrap()
            .with_origin("https://app.example")
            .unwrap()
            .with_user_verification(UserVerificationRequirement::Required);
        RelyingParty::new(config)
    }

    fn stored(id: &[u8]) -> StoredCredential {
        StoredCredential {
            credential_id: id.to_vec(),
            user_id: "alice".to_string(),
            public_key: vec![0xa0],
            algorithm: CoseAlgorithm::Es256,
            sign_count: 0,
            transports: vec![AuthenticatorTransport::Usb],
            device_type: DeviceType::SingleDevice,
            backed_up: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_registration_options_shape() {
        let rp = relying_party();
        let challenges = MemoryChallengeStore::new();

        let options = rp
            .generate_registration_options(&challenges, "alice", "alice@app.example", "Alice", &[stored(b"old")])
            .await
            .unwrap();

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["rp"]["id"], "app.example");
        assert_eq!(json["user"]["id"], base64url_encode(b"alice"));
        assert_eq!(json["user"]["displayName"], "Alice");
        assert_eq!(json["pubKeyCredParams"][0]["type"], "public-key");
        assert_eq!(json["pubKeyCredParams"][0]["alg"], -7);
        assert_eq!(json["pubKeyCredParams"][1]["alg"], -8);
        assert_eq!(json["timeout"], 60_000);
        assert_eq!(json["excludeCredentials"][0]["id"], base64url_encode(b"old"));
        assert_eq!(json["excludeCredentials"][0]["transports"][0], "usb");
        assert_eq!(json["authenticatorSelection"]["userVerification"], "required");
        assert_eq!(json["authenticatorSelection"]["residentKey"], "preferred");
        assert_eq!(json["attestation"], "none");

        let consumed = challenges
            .consume_challenge(&options.challenge)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(consumed.user_id.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_authentication_options_shape() {
        let rp = relying_party();
        let challenges = MemoryChallengeStore::new();

        let options = rp
            .generate_authentication_options(&challenges, None, &[stored(b"cred")])
            .await
            .unwrap();

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["rpId"], "app.example");
        assert_eq!(json["allowCredentials"][0]["type"], "public-key");
        assert_eq!(json["userVerification"], "required");
        assert_eq!(challenges.len(), 1);

        let consumed = challenges
            .consume_challenge(&options.challenge)
            .await
            .unwrap()
            .unwrap();
        assert!(consumed.user_id.is_none());
    }
}
