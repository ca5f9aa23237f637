//! Client data command implementation.

use anyhow::{Context, Result};
use passkey_core::encoding::base64url_encode;
use passkey_core::ClientData;
use serde_json::json;

use super::Output;
use crate::utils::read_input;

/// Execute the client-data command.
pub fn execute(input: &str, from_file: bool, output: &Output) -> Result<()> {
    let bytes = read_input(input, from_file)?;
    let client_data = ClientData::from_base64url(&base64url_encode(&bytes))
        .context("Failed to parse client data")?;
    let collected = &client_data.collected;

    if output.json {
        return output.print_json(&json!({
            "type": collected.ceremony_type,
            "challenge": collected.challenge,
            "origin": collected.origin,
            "crossOrigin": collected.cross_origin,
            "topOrigin": collected.top_origin,
            "hash": hex::encode(client_data.hash()),
        }));
    }

    output.heading("Client data");
    output.field("Type", &collected.ceremony_type);
    output.field("Challenge", &collected.challenge);
    output.field("Origin", &collected.origin);
    if let Some(cross_origin) = collected.cross_origin {
        output.field("Cross origin", cross_origin);
    }
    if let Some(top_origin) = &collected.top_origin {
        output.field("Top origin", top_origin);
    }
    output.field("SHA-256", hex::encode(client_data.hash()));
    Ok(())
}
