//! `clientDataJSON` decoding.

use serde::{Deserialize, Serialize};

use crate::config::normalize_origin;
use crate::crypto::sha256;
use crate::encoding::base64url_decode;
use crate::error::{PasskeyError, Result};

/// Client data `type` for registration ceremonies.
pub const TYPE_CREATE: &str = "webauthn.create";

/// Client data `type` for authentication ceremonies.
pub const TYPE_GET: &str = "webauthn.get";

/// The JSON object the browser collects and the authenticator signs over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedClientData {
    #[serde(rename = "type")]
    pub ceremony_type: String,
    /// Base64url-encoded challenge.
    pub challenge: String,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_origin: Option<String>,
}

/// Decoded client data together with the exact bytes it was parsed from.
///
/// Signatures cover the hash of the raw bytes, so they are kept verbatim.
#[derive(Debug, Clone)]
pub struct ClientData {
    pub raw: Vec<u8>,
    pub collected: CollectedClientData,
}

impl ClientData {
    /// Decode base64url -> UTF-8 -> JSON.
    pub fn from_base64url(encoded: &str) -> Result<Self> {
        let raw = base64url_decode(encoded)?;
        let text = std::str::from_utf8(&raw)
            .map_err(|_| PasskeyError::ClientData("clientDataJSON is not UTF-8".into()))?;
        let collected: CollectedClientData = serde_json::from_str(text)?;
        Ok(Self { raw, collected })
    }

    /// SHA-256 of the raw client data bytes.
    pub fn hash(&self) -> [u8; 32] {
        sha256(&self.raw)
    }

    pub fn require_type(&self, expected: &'static str) -> Result<()> {
        if self.collected.ceremony_type != expected {
            return Err(PasskeyError::CeremonyType {
                expected,
                actual: self.collected.ceremony_type.clone(),
            });
        }
        Ok(())
    }

    /// Check the origin against an allow-list. An empty list allows any origin.
    ///
    /// Both sides are compared in normalized form; an entry that does not
    /// parse as a URL only matches byte for byte.
    pub fn require_origin(&self, allowed: &[String]) -> Result<()> {
        if allowed.is_empty() {
            return Ok(());
        }
        let received = normalized(&self.collected.origin);
        if allowed.iter().any(|o| normalized(o) == received) {
            Ok(())
        } else {
            Err(PasskeyError::Origin(self.collected.origin.clone()))
        }
    }
}

fn normalized(origin: &str) -> String {
    normalize_origin(origin).unwrap_or_else(|_| origin.to_string())
}
