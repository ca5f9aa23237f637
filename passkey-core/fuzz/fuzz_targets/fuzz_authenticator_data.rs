#![no_main]

//! Fuzz target for AuthenticatorData::parse()
//!
//! Run with: cargo +nightly fuzz run fuzz_authenticator_data

use libfuzzer_sys::fuzz_target;
use passkey_core::AuthenticatorData;

fuzz_target!(|data: &[u8]| {
    if let Ok(parsed) = AuthenticatorData::parse(data) {
        // Attested data is only ever present when its flag is set
        assert_eq!(
            parsed.attested_credential_data.is_some(),
            parsed.flags.attested_credential_data()
        );
    }
});
