//! Attestation object command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use passkey_core::encoding::base64url_encode;
use passkey_core::{AttestationObject, AuthenticatorData, ClientData, CosePublicKey};
use serde_json::json;
use tracing::{debug, info};

use super::Output;
use crate::utils::{describe_flags, read_input};

/// Execute the attestation command.
pub fn execute(
    input: &str,
    from_file: bool,
    client_data: Option<&str>,
    output: &Output,
) -> Result<()> {
    let bytes = read_input(input, from_file)?;
    let object = AttestationObject::from_cbor(&bytes).context("Failed to parse attestation object")?;
    let data =
        AuthenticatorData::parse(&object.auth_data).context("Failed to parse authenticator data")?;
    let attested = data
        .attested_credential_data
        .as_ref()
        .context("Failed to parse attestation object: no attested credential data")?;
    let key = CosePublicKey::from_cbor(&attested.credential_public_key)
        .context("Failed to decode credential public key")?;

    let attestation_type = match client_data {
        Some(encoded) => {
            let hash = ClientData::from_base64url(encoded)
                .context("Failed to parse client data")?
                .hash();
            let kind = object
                .verify_statement(&hash, &key)
                .context("Check failed: attestation statement")?;
            debug!(?kind, "Attestation statement checked");
            Some(kind)
        }
        None => None,
    };

    info!(fmt = %object.fmt, "Decoded attestation object");

    if output.json {
        return output.print_json(&json!({
            "fmt": object.fmt,
            "attestationType": attestation_type,
            "aaguid": attested.aaguid_string(),
            "credentialId": base64url_encode(&attested.credential_id),
            "algorithm": key.algorithm().id(),
            "signCount": data.sign_count,
            "flags": describe_flags(data.flags),
        }));
    }

    output.heading("Attestation object");
    output.field("Format", object.fmt);
    output.field("AAGUID", attested.aaguid_string());
    output.field("Credential id", base64url_encode(&attested.credential_id));
    output.field("Algorithm", format!("{:?} ({})", key.algorithm(), key.algorithm().id()));
    output.field("Sign count", data.sign_count);
    output.field("Flags", describe_flags(data.flags));
    match attestation_type {
        Some(kind) => output.field("Statement", format!("{kind:?}").green()),
        None => output.field("Statement", "not checked (pass --client-data)".dimmed()),
    }
    Ok(())
}
