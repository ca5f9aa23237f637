//! CLI integration tests for passkey-cli.
//!
//! These tests run the actual binary and check outputs and exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// SHA-256("localhost")
const LOCALHOST_HASH: &str = "49960de5880e8c687434170f6476605b8fe4aeb9a28632c7995cf3ba831d9763";

/// P-256 generator point, a valid public key
const P256_GX: &str = "6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296";
const P256_GY: &str = "4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5";

/// {"type":"webauthn.get","challenge":"AAEC","origin":"https://app.example"}
const CLIENT_DATA: &str =
    "eyJ0eXBlIjoid2ViYXV0aG4uZ2V0IiwiY2hhbGxlbmdlIjoiQUFFQyIsIm9yaWdpbiI6Imh0dHBzOi8vYXBwLmV4YW1wbGUifQ";

/// Get a Command for the passkey binary.
fn passkey() -> Command {
    Command::cargo_bin("passkey").unwrap()
}

/// Authenticator data header for localhost with UP set and counter 1.
fn assertion_auth_data() -> String {
    format!("{LOCALHOST_HASH}0500000001")
}

/// `none` attestation object around attested data with a P-256 key.
fn attestation_object() -> String {
    let cose = format!("a5010203262001215820{P256_GX}225820{P256_GY}");
    let auth_data = format!("{LOCALHOST_HASH}4100000000{}0010{}{cose}", "00".repeat(16), "ab".repeat(16));
    assert_eq!(auth_data.len() / 2, 148);

    let fmt = hex::encode("fmt");
    let none = hex::encode("none");
    let att_stmt = hex::encode("attStmt");
    let auth_data_key = hex::encode("authData");
    format!("a363{fmt}64{none}67{att_stmt}a068{auth_data_key}5894{auth_data}")
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    passkey()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Inspect and verify WebAuthn passkey payloads"))
        .stdout(predicate::str::contains("cbor"))
        .stdout(predicate::str::contains("auth-data"))
        .stdout(predicate::str::contains("client-data"))
        .stdout(predicate::str::contains("attestation"))
        .stdout(predicate::str::contains("ceremony"));
}

#[test]
fn test_help_shows_exit_codes() {
    passkey()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("66"));
}

#[test]
fn test_version_displays_version() {
    passkey()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("passkey"));
}

// ============================================================================
// CBOR Tests
// ============================================================================

#[test]
fn test_cbor_reports_bytes_read() {
    passkey()
        .args(["--color", "never", "cbor", "1a00010000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("65536"))
        .stdout(predicate::str::contains("5 of 5"));
}

#[test]
fn test_cbor_json_output() {
    passkey()
        .args(["--json", "cbor", "a201020326"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"bytesRead\": 5"))
        .stdout(predicate::str::contains("\"3\": -7"));
}

#[test]
fn test_cbor_half_float_is_data_error() {
    passkey()
        .args(["cbor", "f93c00"])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Failed to decode CBOR"));
}

#[test]
fn test_cbor_from_file() {
    let temp = TempDir::new().unwrap();
    let binary = temp.path().join("item.cbor");
    let text = temp.path().join("item.txt");
    fs::write(&binary, [0x83, 0x01, 0x02, 0x03]).unwrap();
    fs::write(&text, "0x83010203\n").unwrap();

    for path in [&binary, &text] {
        passkey()
            .args(["--quiet", "cbor", "--file", path.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("[1, 2, 3]"));
    }
}

#[test]
fn test_missing_file_returns_input_error() {
    passkey()
        .args(["cbor", "--file", "/nonexistent/payload.bin"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read input file"));
}

// ============================================================================
// Authenticator Data Tests
// ============================================================================

#[test]
fn test_auth_data_rp_id_match() {
    passkey()
        .args(["--color", "never", "auth-data", &assertion_auth_data(), "--rp-id", "localhost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UP"))
        .stdout(predicate::str::contains("Sign count: 1"))
        .stdout(predicate::str::contains("matches"));
}

#[test]
fn test_auth_data_rp_id_mismatch() {
    passkey()
        .args(["auth-data", &assertion_auth_data(), "--rp-id", "evil.example"])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("rpIdHash does not match"));
}

#[test]
fn test_auth_data_too_short() {
    passkey()
        .args(["auth-data", LOCALHOST_HASH])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Failed to parse authenticator data"));
}

// ============================================================================
// Client Data and Attestation Tests
// ============================================================================

#[test]
fn test_client_data_decodes() {
    passkey()
        .args(["--json", "client-data", CLIENT_DATA])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"webauthn.get\""))
        .stdout(predicate::str::contains("\"origin\": \"https://app.example\""));
}

#[test]
fn test_attestation_object_decodes() {
    passkey()
        .args(["--color", "never", "attestation", &attestation_object()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Format: none"))
        .stdout(predicate::str::contains("Es256"))
        .stdout(predicate::str::contains("not checked"));
}

#[test]
fn test_attestation_statement_checked_with_client_data() {
    passkey()
        .args(["--json", "attestation", &attestation_object(), "--client-data", CLIENT_DATA])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"attestationType\": \"none\""))
        .stdout(predicate::str::contains("\"algorithm\": -7"));
}

// ============================================================================
// Ceremony Tests
// ============================================================================

#[test]
fn test_ceremony_passes() {
    passkey()
        .args(["--color", "never", "ceremony"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CEREMONY PASSED"))
        .stdout(predicate::str::contains("Replay: rejected"));
}

#[test]
fn test_ceremony_packed_json() {
    passkey()
        .args(["--json", "ceremony", "--attestation", "packed", "--rp-id", "app.example", "--origin", "https://app.example"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"attestationType\": \"self_attestation\""))
        .stdout(predicate::str::contains("\"counter\": 2"))
        .stdout(predicate::str::contains("\"replayRejected\": true"));
}

#[test]
fn test_ceremony_rejects_invalid_origin() {
    passkey()
        .args(["ceremony", "--origin", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid relying party configuration"));
}

#[test]
fn test_color_never_no_ansi() {
    passkey()
        .args(["--color", "never", "cbor", "1a00010000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\x1b[").not());
}
