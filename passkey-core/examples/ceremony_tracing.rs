//! Example running a full passkey registration and sign-in with tracing output.
//!
//! Run with: cargo run -p passkey-core --example ceremony_tracing

use passkey_core::{
    AttestationFormat, CredentialStore, MemoryChallengeStore, MemoryCredentialStore, RelyingParty,
    RelyingPartyConfig, SoftAuthenticator, UserVerificationRequirement,
};
use tracing_subscriber::{fmt, EnvFilter};

const RP_ID: &str = "app.example";
const ORIGIN: &str = "https://app.example";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber with debug level
    fmt()
        .with_env_filter(EnvFilter::new("passkey_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== Passkey Ceremony Tracing Demo ===\n");

    let config = RelyingPartyConfig::new(RP_ID, "Example App")?
        .with_origin(ORIGIN)?
        .with_user_verification(UserVerificationRequirement::Required);
    let rp = RelyingParty::new(config);
    let challenges = MemoryChallengeStore::new();
    let credentials = MemoryCredentialStore::new();

    let mut authenticator = SoftAuthenticator::new()?;
    authenticator.sign_count = 1;

    println!("\nRegistering...\n");
    let options = rp
        .generate_registration_options(&challenges, "alice", "alice@app.example", "Alice", &[])
        .await?;
    println!("{}\n", serde_json::to_string_pretty(&options)?);

    let response =
        authenticator.make_credential(RP_ID, ORIGIN, &options.challenge, AttestationFormat::Packed)?;
    let registration = rp.verify_registration_response(&response, &challenges).await;

    let Some(info) = registration.registration_info else {
        println!("\n❌ Registration failed");
        return Ok(());
    };
    println!("\n✅ Registered {:?} credential ({:?})", info.algorithm, info.attestation_type);
    credentials
        .insert_credential(info.into_stored_credential("alice"))
        .await?;

    println!("\nSigning in...\n");
    let options = rp
        .generate_authentication_options(&challenges, Some("alice"), &[])
        .await?;
    let assertion =
        authenticator.get_assertion(RP_ID, ORIGIN, &options.challenge, Some("alice"))?;
    let authentication = rp
        .verify_authentication_response(&assertion, &challenges, &credentials)
        .await;

    match authentication.authentication_info {
        Some(auth) => {
            credentials
                .update_credential(&auth.credential_id, auth.new_counter, auth.backed_up)
                .await?;
            println!("\n✅ Signed in as {} (counter {})", auth.user_id, auth.new_counter);
        }
        None => println!("\n❌ Sign-in failed"),
    }

    println!("\nReplaying the same assertion...\n");
    let replay = rp
        .verify_authentication_response(&assertion, &challenges, &credentials)
        .await;
    println!("\nReplay verified: {}", replay.verified);

    Ok(())
}
