//! Ceremony command implementation.
//!
//! Registers a software authenticator, signs in with it and replays the
//! assertion, all against in-memory stores.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use passkey_core::encoding::base64url_encode;
use passkey_core::{
    AttestationFormat, CredentialStore, MemoryChallengeStore, MemoryCredentialStore, RelyingParty,
    RelyingPartyConfig, SoftAuthenticator,
};
use serde_json::json;
use tracing::info;

use super::Output;

const USER_ID: &str = "cli-user";

/// Execute the ceremony command.
pub async fn execute(
    rp_id: &str,
    origin: &str,
    format: AttestationFormat,
    output: &Output,
) -> Result<()> {
    let config = RelyingPartyConfig::new(rp_id, "Passkey CLI")
        .and_then(|config| config.with_origin(origin))
        .context("Invalid relying party configuration")?;
    let rp = RelyingParty::new(config);
    let challenges = MemoryChallengeStore::new();
    let credentials = MemoryCredentialStore::new();

    let mut authenticator = SoftAuthenticator::new()?;
    authenticator.sign_count = 1;

    let options = rp
        .generate_registration_options(&challenges, USER_ID, USER_ID, "CLI User", &[])
        .await?;
    let response = authenticator.make_credential(rp_id, origin, &options.challenge, format)?;
    let registration = rp
        .verify_registration(&response, &challenges)
        .await
        .context("Check failed: registration")?;
    let algorithm = registration.algorithm;
    let attestation_type = registration.attestation_type;
    credentials
        .insert_credential(registration.into_stored_credential(USER_ID))
        .await?;
    info!(?algorithm, ?attestation_type, "Registered software credential");

    let options = rp
        .generate_authentication_options(&challenges, Some(USER_ID), &[])
        .await?;
    let assertion =
        authenticator.get_assertion(rp_id, origin, &options.challenge, Some(USER_ID))?;
    let authentication = rp
        .verify_authentication(&assertion, &challenges, &credentials)
        .await
        .context("Check failed: authentication")?;
    credentials
        .update_credential(
            &authentication.credential_id,
            authentication.new_counter,
            authentication.backed_up,
        )
        .await?;

    let replay = rp
        .verify_authentication_response(&assertion, &challenges, &credentials)
        .await;
    if replay.verified {
        bail!("Check failed: replayed assertion was accepted");
    }

    if output.json {
        return output.print_json(&json!({
            "rpId": rp_id,
            "credentialId": base64url_encode(&authentication.credential_id),
            "algorithm": algorithm.id(),
            "attestationType": attestation_type,
            "counter": authentication.new_counter,
            "replayRejected": true,
        }));
    }

    if !output.quiet {
        println!();
        println!("{}", "╔════════════════════════════════════════╗".green());
        println!(
            "{}",
            "║            CEREMONY PASSED             ║".green().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".green());
        println!();
    }
    output.field("Credential id", base64url_encode(&authentication.credential_id));
    output.field("Algorithm", format!("{algorithm:?}"));
    output.field("Attestation", format!("{attestation_type:?}"));
    output.field("Counter", authentication.new_counter);
    output.field("Replay", "rejected".green());
    Ok(())
}
