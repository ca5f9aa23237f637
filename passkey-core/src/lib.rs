//! Passkey Core - WebAuthn / FIDO2 ceremony verification
//!
//! This crate verifies passkey registration (attestation) and authentication
//! (assertion) ceremonies on the Relying Party side.
//!
//! # Features
//!
//! - Minimal CBOR decoder that reports exactly how many bytes an item used
//! - Authenticator data parsing, including attested credential data and extensions
//! - ES256 and Ed25519 assertion signatures
//! - Attestation statement classification (none, self, basic, attestation CA)
//! - Single-use challenges behind an async storage contract
//! - Uniform `verified: false` results so responses never reveal which check failed
//!
//! # Example
//!
//! ```no_run
//! use passkey_core::{
//!     AttestationFormat, MemoryChallengeStore, MemoryCredentialStore, RelyingParty,
//!     RelyingPartyConfig, SoftAuthenticator,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RelyingPartyConfig::new("app.example", "Example")?
//!     .with_origin("https://app.example")?;
//! let rp = RelyingParty::new(config);
//! let challenges = MemoryChallengeStore::new();
//! let credentials = MemoryCredentialStore::new();
//!
//! let options = rp
//!     .generate_registration_options(&challenges, "alice", "alice", "Alice", &[])
//!     .await?;
//!
//! // In production the browser produces this response
//! let authenticator = SoftAuthenticator::new()?;
//! let response = authenticator.make_credential(
//!     "app.example",
//!     "https://app.example",
//!     &options.challenge,
//!     AttestationFormat::None,
//! )?;
//!
//! let result = rp.verify_registration_response(&response, &challenges).await;
//! if let Some(info) = result.registration_info {
//!     use passkey_core::CredentialStore;
//!     credentials.insert_credential(info.into_stored_credential("alice")).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod attestation;
pub mod authenticator_data;
pub mod cbor;
pub mod ceremony;
pub mod challenge;
pub mod client_data;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod response;
pub mod soft_authenticator;
pub mod storage;

// Re-export main types for convenience
pub use attestation::{AttestationFormat, AttestationObject, AttestationType};
pub use authenticator_data::{AttestedCredentialData, AuthenticatorData, AuthenticatorFlags};
pub use cbor::{decode, decode_all, CborValue};
pub use ceremony::{
    check_sign_count, AuthenticationInfo, AuthenticationOptions, AuthenticationVerification,
    RegistrationInfo, RegistrationOptions, RegistrationVerification, RelyingParty,
};
pub use challenge::{generate_challenge, CHALLENGE_SIZE_BYTES};
pub use client_data::{ClientData, CollectedClientData};
pub use config::{ConfigError, RelyingPartyConfig, UserVerificationRequirement};
pub use crypto::{CoseAlgorithm, CosePublicKey};
pub use error::{DecodeError, PasskeyError, Result};
pub use response::{AuthenticationResponse, AuthenticatorTransport, RegistrationResponse};
pub use soft_authenticator::SoftAuthenticator;
pub use storage::{
    ChallengeStore, CredentialStore, DeviceType, MemoryChallengeStore, MemoryCredentialStore,
    StorageError, StoredCredential,
};
