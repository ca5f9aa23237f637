//! Common utility functions shared across CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use passkey_core::encoding::base64url_decode;
use passkey_core::AuthenticatorFlags;
use tracing::debug;

/// Resolve a command input to raw bytes.
///
/// With `from_file`, `input` is a path. Files holding hex or base64url text
/// are decoded; anything else is taken as raw binary. Without `from_file`,
/// `input` itself is hex (optionally `0x`-prefixed) or base64url.
pub fn read_input(input: &str, from_file: bool) -> Result<Vec<u8>> {
    if from_file {
        let path = Path::new(input);
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Read input file");

        let decoded = std::str::from_utf8(&bytes)
            .ok()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .and_then(|text| decode_text(text).ok());
        return Ok(decoded.unwrap_or(bytes));
    }

    decode_text(input.trim()).context("Failed to decode input as hex or base64url")
}

fn decode_text(text: &str) -> Result<Vec<u8>> {
    let stripped = text.strip_prefix("0x").unwrap_or(text);
    let looks_hex = !stripped.is_empty()
        && stripped.len() % 2 == 0
        && stripped.chars().all(|c| c.is_ascii_hexdigit());

    if looks_hex {
        debug!(encoding = "hex", "Decoded input");
        return Ok(hex::decode(stripped)?);
    }
    let bytes = base64url_decode(text)?;
    debug!(encoding = "base64url", "Decoded input");
    Ok(bytes)
}

/// Short flag listing such as `UP UV BE`.
pub fn describe_flags(flags: AuthenticatorFlags) -> String {
    let names = [
        (flags.user_present(), "UP"),
        (flags.user_verified(), "UV"),
        (flags.backup_eligible(), "BE"),
        (flags.backup_state(), "BS"),
        (flags.attested_credential_data(), "AT"),
        (flags.extension_data(), "ED"),
    ];
    let set: Vec<&str> = names
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();
    if set.is_empty() {
        "none".to_string()
    } else {
        set.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_hex_and_base64url() {
        assert_eq!(read_input("1a00010000", false).unwrap(), vec![0x1a, 0, 1, 0, 0]);
        assert_eq!(read_input("0xA0", false).unwrap(), vec![0xa0]);
        assert_eq!(read_input("AQID", false).unwrap(), vec![1, 2, 3]);
        assert!(read_input("not valid!", false).is_err());
    }

    #[test]
    fn test_describe_flags() {
        assert_eq!(describe_flags(AuthenticatorFlags(0x45)), "UP UV AT");
        assert_eq!(describe_flags(AuthenticatorFlags(0)), "none");
    }
}
