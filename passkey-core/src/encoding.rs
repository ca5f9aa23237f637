//! Base64url helpers for WebAuthn wire fields.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Encode bytes as unpadded base64url.
pub fn base64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url, forgiving trailing padding some clients append.
pub fn base64url_decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_is_forgiven() {
        assert_eq!(base64url_decode("AQI").unwrap(), vec![1, 2]);
        assert_eq!(base64url_decode("AQI=").unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_url_safe_alphabet() {
        assert_eq!(base64url_encode([0xfb, 0xff]), "-_8");
        assert!(base64url_decode("+/8").is_err());
    }
}
