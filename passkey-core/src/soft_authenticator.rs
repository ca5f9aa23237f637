//! Software authenticator for tests, demos and local tooling.
//!
//! WARNING: keys live in process memory. Do not use in production.
//!
//! Produces the same wire shapes a browser hands to the server, with an ES256
//! credential and either `none` or `packed` self attestation.

use ciborium::value::Value;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};

use crate::attestation::AttestationFormat;
use crate::authenticator_data::AuthenticatorFlags;
use crate::client_data::{CollectedClientData, TYPE_CREATE, TYPE_GET};
use crate::crypto::{sha256, CoseAlgorithm};
use crate::encoding::base64url_encode;
use crate::error::{PasskeyError, Result};
use crate::response::{
    AuthenticationResponse, AuthenticatorAssertionResponse, AuthenticatorAttachment,
    AuthenticatorAttestationResponse, AuthenticatorTransport, RegistrationResponse,
    PUBLIC_KEY_CREDENTIAL_TYPE,
};

const CREDENTIAL_ID_LEN: usize = 16;

/// An in-memory ES256 authenticator holding a single credential
pub struct SoftAuthenticator {
    signing_key: SigningKey,
    credential_id: Vec<u8>,
    pub aaguid: [u8; 16],
    /// Counter reported in the next assertion. A zero counter stays zero.
    pub sign_count: u32,
    pub user_present: bool,
    pub user_verified: bool,
    pub backup_eligible: bool,
    pub backup_state: bool,
}

impl SoftAuthenticator {
    /// Create an authenticator with a random key and credential id.
    pub fn new() -> Result<Self> {
        let mut seed = [0u8; 32];
        getrandom::fill(&mut seed).map_err(|e| PasskeyError::Random(e.to_string()))?;
        let mut credential_id = vec![0u8; CREDENTIAL_ID_LEN];
        getrandom::fill(&mut credential_id).map_err(|e| PasskeyError::Random(e.to_string()))?;
        Self::with_parts(&seed, credential_id)
    }

    /// Deterministic authenticator for reproducible fixtures.
    pub fn from_seed(seed: [u8; 32]) -> Result<Self> {
        let credential_id = sha256(&seed)[..CREDENTIAL_ID_LEN].to_vec();
        Self::with_parts(&seed, credential_id)
    }

    fn with_parts(seed: &[u8; 32], credential_id: Vec<u8>) -> Result<Self> {
        let signing_key = SigningKey::from_slice(seed)
            .map_err(|_| PasskeyError::InvalidPublicKey("seed is not a valid P-256 scalar".into()))?;
        Ok(Self {
            signing_key,
            credential_id,
            aaguid: [0u8; 16],
            sign_count: 0,
            user_present: true,
            user_verified: true,
            backup_eligible: false,
            backup_state: false,
        })
    }

    pub fn credential_id(&self) -> &[u8] {
        &self.credential_id
    }

    /// Credential public key as a CBOR-encoded COSE EC2 key
    pub fn cose_public_key(&self) -> Result<Vec<u8>> {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let sec1 = point.as_bytes();

        encode(&Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(2.into())),
            (
                Value::Integer(3.into()),
                Value::Integer(CoseAlgorithm::Es256.id().into()),
            ),
            (Value::Integer((-1).into()), Value::Integer(1.into())),
            (Value::Integer((-2).into()), Value::Bytes(sec1[1..33].to_vec())),
            (Value::Integer((-3).into()), Value::Bytes(sec1[33..65].to_vec())),
        ]))
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.user_present {
            flags |= AuthenticatorFlags::USER_PRESENT;
        }
        if self.user_verified {
            flags |= AuthenticatorFlags::USER_VERIFIED;
        }
        if self.backup_eligible {
            flags |= AuthenticatorFlags::BACKUP_ELIGIBLE;
        }
        if self.backup_state {
            flags |= AuthenticatorFlags::BACKUP_STATE;
        }
        flags
    }

    /// Authenticator data with attested credential data, as produced at registration.
    pub fn attested_authenticator_data(&self, rp_id: &str) -> Result<Vec<u8>> {
        let mut data = authenticator_data_header(
            rp_id,
            self.flags() | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
            self.sign_count,
        );
        data.extend_from_slice(&self.aaguid);
        let id_len = u16::try_from(self.credential_id.len())
            .map_err(|_| PasskeyError::Encode("credential id too long".into()))?;
        data.extend_from_slice(&id_len.to_be_bytes());
        data.extend_from_slice(&self.credential_id);
        data.extend_from_slice(&self.cose_public_key()?);
        Ok(data)
    }

    /// Authenticator data for an assertion.
    pub fn assertion_authenticator_data(&self, rp_id: &str) -> Vec<u8> {
        authenticator_data_header(rp_id, self.flags(), self.sign_count)
    }

    /// Sign `authData || SHA-256(clientDataJSON)`, DER encoded.
    fn sign(&self, auth_data: &[u8], client_data_json: &str) -> Vec<u8> {
        let mut message = auth_data.to_vec();
        message.extend_from_slice(&sha256(client_data_json.as_bytes()));
        let signature: Signature = self.signing_key.sign(&message);
        signature.to_der().as_bytes().to_vec()
    }

    /// Wrap arbitrary client data and authenticator data into a registration response.
    pub fn registration_response(
        &self,
        client_data_json: &str,
        auth_data: Vec<u8>,
        format: AttestationFormat,
    ) -> Result<RegistrationResponse> {
        let att_stmt = match format {
            AttestationFormat::None => Value::Map(Vec::new()),
            AttestationFormat::Packed => Value::Map(vec![
                (
                    Value::Text("alg".into()),
                    Value::Integer(CoseAlgorithm::Es256.id().into()),
                ),
                (
                    Value::Text("sig".into()),
                    Value::Bytes(self.sign(&auth_data, client_data_json)),
                ),
            ]),
            other => {
                return Err(PasskeyError::Unsupported(format!(
                    "software authenticator cannot produce {other} attestation"
                )))
            }
        };

        let attestation_object = encode(&Value::Map(vec![
            (Value::Text("fmt".into()), Value::Text(format.as_str().into())),
            (Value::Text("attStmt".into()), att_stmt),
            (Value::Text("authData".into()), Value::Bytes(auth_data)),
        ]))?;

        let id = base64url_encode(&self.credential_id);
        Ok(RegistrationResponse {
            id: id.clone(),
            raw_id: id,
            credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            response: AuthenticatorAttestationResponse {
                client_data_json: base64url_encode(client_data_json),
                attestation_object: base64url_encode(attestation_object),
                transports: vec![AuthenticatorTransport::Internal],
            },
            authenticator_attachment: Some(AuthenticatorAttachment::Platform),
            client_extension_results: None,
        })
    }

    /// Answer `navigator.credentials.create()`.
    pub fn make_credential(
        &self,
        rp_id: &str,
        origin: &str,
        challenge: &str,
        format: AttestationFormat,
    ) -> Result<RegistrationResponse> {
        let client_data = client_data_json(TYPE_CREATE, challenge, origin)?;
        let auth_data = self.attested_authenticator_data(rp_id)?;
        self.registration_response(&client_data, auth_data, format)
    }

    /// Sign arbitrary client data and authenticator data into an assertion.
    ///
    /// `user_id` is the account id; it is sent base64url-encoded as `userHandle`.
    pub fn assertion_response(
        &self,
        client_data_json: &str,
        auth_data: &[u8],
        user_id: Option<&str>,
    ) -> AuthenticationResponse {
        let id = base64url_encode(&self.credential_id);
        AuthenticationResponse {
            id: id.clone(),
            raw_id: id,
            credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            response: AuthenticatorAssertionResponse {
                client_data_json: base64url_encode(client_data_json),
                authenticator_data: base64url_encode(auth_data),
                signature: base64url_encode(self.sign(auth_data, client_data_json)),
                user_handle: user_id.map(|u| base64url_encode(u.as_bytes())),
            },
            authenticator_attachment: Some(AuthenticatorAttachment::Platform),
            client_extension_results: None,
        }
    }

    /// Answer `navigator.credentials.get()`, bumping a nonzero counter first.
    pub fn get_assertion(
        &mut self,
        rp_id: &str,
        origin: &str,
        challenge: &str,
        user_id: Option<&str>,
    ) -> Result<AuthenticationResponse> {
        if self.sign_count > 0 {
            self.sign_count = self.sign_count.saturating_add(1);
        }
        let client_data = client_data_json(TYPE_GET, challenge, origin)?;
        let auth_data = self.assertion_authenticator_data(rp_id);
        Ok(self.assertion_response(&client_data, &auth_data, user_id))
    }
}

impl std::fmt::Debug for SoftAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftAuthenticator")
            .field("credential_id", &base64url_encode(&self.credential_id))
            .field("sign_count", &self.sign_count)
            .field("flags", &format_args!("{:#04x}", self.flags()))
            .finish_non_exhaustive()
    }
}

/// Serialized `clientDataJSON` as a browser would produce it.
pub fn client_data_json(ceremony_type: &str, challenge: &str, origin: &str) -> Result<String> {
    let collected = CollectedClientData {
        ceremony_type: ceremony_type.to_string(),
        challenge: challenge.to_string(),
        origin: origin.to_string(),
        cross_origin: Some(false),
        top_origin: None,
    };
    Ok(serde_json::to_string(&collected)?)
}

/// The fixed 37-byte authenticator data header.
pub fn authenticator_data_header(rp_id: &str, flags: u8, sign_count: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(37);
    data.extend_from_slice(&sha256(rp_id.as_bytes()));
    data.push(flags);
    data.extend_from_slice(&sign_count.to_be_bytes());
    data
}

fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).map_err(|e| PasskeyError::Encode(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::AttestationObject;
    use crate::authenticator_data::AuthenticatorData;
    use crate::crypto::CosePublicKey;
    use crate::encoding::base64url_decode;

    #[test]
    fn test_from_seed_is_deterministic() {
        let a = SoftAuthenticator::from_seed([5u8; 32]).unwrap();
        let b = SoftAuthenticator::from_seed([5u8; 32]).unwrap();
        assert_eq!(a.credential_id(), b.credential_id());
        assert_eq!(a.cose_public_key().unwrap(), b.cose_public_key().unwrap());
        assert!(SoftAuthenticator::from_seed([0u8; 32]).is_err());
    }

    #[test]
    fn test_attested_data_parses_back() {
        let authenticator = SoftAuthenticator::from_seed([5u8; 32]).unwrap();
        let raw = authenticator.attested_authenticator_data("app.example").unwrap();

        let parsed = AuthenticatorData::parse(&raw).unwrap();
        assert!(parsed.flags.user_present());
        assert!(parsed.flags.user_verified());
        let attested = parsed.attested_credential_data.unwrap();
        assert_eq!(attested.credential_id, authenticator.credential_id());

        let key = CosePublicKey::from_cbor(&attested.credential_public_key).unwrap();
        assert_eq!(key.algorithm(), CoseAlgorithm::Es256);
    }

    #[test]
    fn test_packed_statement_verifies() {
        let authenticator = SoftAuthenticator::from_seed([5u8; 32]).unwrap();
        let response = authenticator
            .make_credential("app.example", "https://app.example", "Y2hhbGxlbmdl", AttestationFormat::Packed)
            .unwrap();

        let bytes = base64url_decode(&response.response.attestation_object).unwrap();
        let object = AttestationObject::from_cbor(&bytes).unwrap();
        let parsed = AuthenticatorData::parse(&object.auth_data).unwrap();
        let key = CosePublicKey::from_cbor(
            &parsed.attested_credential_data.unwrap().credential_public_key,
        )
        .unwrap();
        let client_data = base64url_decode(&response.response.client_data_json).unwrap();

        assert!(object.verify_statement(&sha256(&client_data), &key).is_ok());
    }

    #[test]
    fn test_counter_behaviour() {
        let mut authenticator = SoftAuthenticator::from_seed([5u8; 32]).unwrap();
        authenticator
            .get_assertion("app.example", "https://app.example", "AA", None)
            .unwrap();
        assert_eq!(authenticator.sign_count, 0);

        authenticator.sign_count = 10;
        authenticator
            .get_assertion("app.example", "https://app.example", "AA", None)
            .unwrap();
        assert_eq!(authenticator.sign_count, 11);
    }
}
