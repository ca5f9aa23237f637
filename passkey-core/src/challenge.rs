//! Random ceremony challenges.

use crate::encoding::base64url_encode;
use crate::error::{PasskeyError, Result};

/// Challenge size in bytes
pub const CHALLENGE_SIZE_BYTES: usize = 32;

/// Generate a fresh base64url-encoded challenge from the OS RNG.
pub fn generate_challenge() -> Result<String> {
    let mut bytes = [0u8; CHALLENGE_SIZE_BYTES];
    getrandom::fill(&mut bytes).map_err(|e| PasskeyError::Random(e.to_string()))?;
    Ok(base64url_encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::base64url_decode;

    #[test]
    fn test_challenge_size_and_uniqueness() {
        let a = generate_challenge().unwrap();
        let b = generate_challenge().unwrap();

        assert_eq!(base64url_decode(&a).unwrap().len(), CHALLENGE_SIZE_BYTES);
        assert!(!a.contains('='));
        assert_ne!(a, b);
    }
}
