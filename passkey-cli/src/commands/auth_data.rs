//! Authenticator data command implementation.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use passkey_core::crypto::sha256;
use passkey_core::encoding::base64url_encode;
use passkey_core::{AuthenticatorData, CosePublicKey};
use serde_json::json;
use tracing::info;

use super::cbor::to_json;
use super::Output;
use crate::utils::{describe_flags, read_input};

/// Execute the auth-data command.
pub fn execute(input: &str, from_file: bool, rp_id: Option<&str>, output: &Output) -> Result<()> {
    let bytes = read_input(input, from_file)?;
    let data = AuthenticatorData::parse(&bytes).context("Failed to parse authenticator data")?;

    let algorithm = data
        .attested_credential_data
        .as_ref()
        .map(|attested| CosePublicKey::from_cbor(&attested.credential_public_key))
        .transpose()
        .context("Failed to decode credential public key")?
        .map(|key| key.algorithm());

    let rp_id_matches = rp_id.map(|id| sha256(id.as_bytes()) == data.rp_id_hash);

    info!(
        flags = data.flags.0,
        sign_count = data.sign_count,
        attested = data.attested_credential_data.is_some(),
        "Parsed authenticator data"
    );

    if output.json {
        let attested = data.attested_credential_data.as_ref().map(|a| {
            json!({
                "aaguid": a.aaguid_string(),
                "credentialId": base64url_encode(&a.credential_id),
                "publicKeyLength": a.credential_public_key.len(),
                "algorithm": algorithm.map(|alg| alg.id()),
            })
        });
        output.print_json(&json!({
            "rpIdHash": hex::encode(data.rp_id_hash),
            "flags": describe_flags(data.flags),
            "signCount": data.sign_count,
            "attestedCredentialData": attested,
            "extensions": data.extensions.as_ref().map(to_json),
            "rpIdMatches": rp_id_matches,
        }))?;
    } else {
        output.heading("Authenticator data");
        output.field("rpIdHash", hex::encode(data.rp_id_hash));
        output.field("Flags", describe_flags(data.flags));
        output.field("Sign count", data.sign_count);

        if let Some(attested) = &data.attested_credential_data {
            output.field("AAGUID", attested.aaguid_string());
            output.field("Credential id", base64url_encode(&attested.credential_id));
            output.field(
                "Public key",
                format!(
                    "{} bytes ({:?})",
                    attested.credential_public_key.len(),
                    algorithm
                ),
            );
        }
        if let Some(extensions) = &data.extensions {
            output.field("Extensions", extensions);
        }
        match rp_id_matches {
            Some(true) => output.field("RP ID", "matches".green()),
            Some(false) => output.field("RP ID", "MISMATCH".red().bold()),
            None => {}
        }
    }

    if let (Some(id), Some(false)) = (rp_id, rp_id_matches) {
        bail!("Check failed: rpIdHash does not match '{id}'");
    }
    Ok(())
}
