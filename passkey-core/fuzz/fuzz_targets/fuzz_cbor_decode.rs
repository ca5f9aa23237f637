#![no_main]

//! Fuzz target for passkey_core::cbor::decode()
//!
//! Decoding must never panic, and a successful decode must never report
//! more bytes than it was given.
//!
//! Run with: cargo +nightly fuzz run fuzz_cbor_decode

use libfuzzer_sys::fuzz_target;
use passkey_core::cbor;

fuzz_target!(|data: &[u8]| {
    if let Ok((_, read)) = cbor::decode(data) {
        assert!(read <= data.len());
    }
});
