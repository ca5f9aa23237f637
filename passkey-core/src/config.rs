//! Relying Party configuration
//!
//! Holds the identity and policy knobs the ceremony verifiers check against.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::crypto::CoseAlgorithm;

/// Default challenge lifetime (5 minutes)
pub const DEFAULT_CHALLENGE_TTL_SECS: u64 = 300;

/// Default client-side ceremony timeout
pub const DEFAULT_TIMEOUT_MS: u32 = 60_000;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Relying party id must not be empty")]
    EmptyRpId,
    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// `userVerification` requirement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationRequirement {
    Required,
    #[default]
    Preferred,
    Discouraged,
}

impl FromStr for UserVerificationRequirement {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "required" => Ok(Self::Required),
            "preferred" => Ok(Self::Preferred),
            "discouraged" => Ok(Self::Discouraged),
            _ => Err(ConfigError::InvalidValue {
                name: "user verification",
                value: s.to_string(),
            }),
        }
    }
}

/// `attestation` conveyance preference sent with registration options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyance {
    #[default]
    None,
    Indirect,
    Direct,
    Enterprise,
}

/// `residentKey` requirement sent with registration options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKeyRequirement {
    Discouraged,
    #[default]
    Preferred,
    Required,
}

/// Relying Party configuration
#[derive(Debug, Clone)]
pub struct RelyingPartyConfig {
    /// Relying Party ID (typically the domain name)
    pub rp_id: String,
    /// Human-readable name for the Relying Party
    pub rp_name: String,
    /// Allowed client origins. Empty means any origin is accepted.
    allowed_origins: Vec<String>,
    pub user_verification: UserVerificationRequirement,
    /// Algorithms accepted for new credentials, in preference order
    pub supported_algorithms: Vec<CoseAlgorithm>,
    pub challenge_ttl: Duration,
    pub timeout_ms: u32,
    pub attestation: AttestationConveyance,
    pub resident_key: ResidentKeyRequirement,
}

impl RelyingPartyConfig {
    /// Create a configuration with default policy and no origin allow-list
    pub fn new(rp_id: &str, rp_name: &str) -> Result<Self, ConfigError> {
        if rp_id.trim().is_empty() {
            return Err(ConfigError::EmptyRpId);
        }

        Ok(Self {
            rp_id: rp_id.to_string(),
            rp_name: rp_name.to_string(),
            allowed_origins: Vec::new(),
            user_verification: UserVerificationRequirement::default(),
            supported_algorithms: vec![CoseAlgorithm::Es256, CoseAlgorithm::EdDsa],
            challenge_ttl: Duration::from_secs(DEFAULT_CHALLENGE_TTL_SECS),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            attestation: AttestationConveyance::default(),
            resident_key: ResidentKeyRequirement::default(),
        })
    }

    /// Add an allowed origin.
    ///
    /// Web origins are normalized to `scheme://host[:port]`. Non-web origins
    /// such as `android:apk-key-hash:...` are kept verbatim.
    pub fn with_origin(mut self, origin: &str) -> Result<Self, ConfigError> {
        let normalized = normalize_origin(origin)
            .map_err(|e| ConfigError::InvalidOrigin(format!("{origin}: {e}")))?;
        if !self.allowed_origins.contains(&normalized) {
            self.allowed_origins.push(normalized);
        }
        Ok(self)
    }

    /// Normalized origin allow-list. Empty means any origin is accepted.
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    pub fn with_user_verification(mut self, requirement: UserVerificationRequirement) -> Self {
        self.user_verification = requirement;
        self
    }

    pub fn with_algorithms(mut self, algorithms: Vec<CoseAlgorithm>) -> Self {
        self.supported_algorithms = algorithms;
        self
    }

    pub fn with_challenge_ttl(mut self, ttl: Duration) -> Self {
        self.challenge_ttl = ttl;
        self
    }

    pub fn with_attestation(mut self, attestation: AttestationConveyance) -> Self {
        self.attestation = attestation;
        self
    }

    pub fn with_resident_key(mut self, resident_key: ResidentKeyRequirement) -> Self {
        self.resident_key = resident_key;
        self
    }

    /// Whether ceremonies must carry the user-verified flag
    pub fn requires_user_verification(&self) -> bool {
        self.user_verification == UserVerificationRequirement::Required
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `PASSKEY_RP_ID` - Relying Party ID (default: "localhost")
    /// - `PASSKEY_RP_NAME` - RP display name (default: "Passkey")
    /// - `PASSKEY_RP_ORIGINS` - comma-separated origins (default: "http://localhost:3000")
    /// - `PASSKEY_USER_VERIFICATION` - required | preferred | discouraged (default: preferred)
    /// - `PASSKEY_CHALLENGE_TTL_SECS` - challenge lifetime (default: 300)
    /// - `PASSKEY_TIMEOUT_MS` - client ceremony timeout (default: 60000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let rp_id = std::env::var("PASSKEY_RP_ID").unwrap_or_else(|_| "localhost".to_string());
        let rp_name = std::env::var("PASSKEY_RP_NAME").unwrap_or_else(|_| "Passkey".to_string());
        let origins = std::env::var("PASSKEY_RP_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let mut config = Self::new(&rp_id, &rp_name)?;
        for origin in origins.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            config = config.with_origin(origin)?;
        }

        if let Ok(uv) = std::env::var("PASSKEY_USER_VERIFICATION") {
            config.user_verification = uv.parse()?;
        }

        if let Ok(ttl) = std::env::var("PASSKEY_CHALLENGE_TTL_SECS") {
            let secs: u64 = ttl.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PASSKEY_CHALLENGE_TTL_SECS",
                value: ttl.clone(),
            })?;
            config.challenge_ttl = Duration::from_secs(secs);
        }

        if let Ok(timeout) = std::env::var("PASSKEY_TIMEOUT_MS") {
            config.timeout_ms = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PASSKEY_TIMEOUT_MS",
                value: timeout.clone(),
            })?;
        }

        tracing::debug!(
            rp_id = %config.rp_id,
            origins = ?config.allowed_origins,
            user_verification = ?config.user_verification,
            "Loaded relying party configuration"
        );
        Ok(config)
    }
}

/// Serialize a web origin as `scheme://host[:port]`.
///
/// Opaque origins (`android:apk-key-hash:...`) come back trimmed but
/// otherwise unchanged.
pub fn normalize_origin(origin: &str) -> Result<String, url::ParseError> {
    let origin = origin.trim();
    let url = Url::parse(origin)?;
    if url.origin().is_tuple() {
        Ok(url.origin().ascii_serialization())
    } else {
        Ok(origin.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = RelyingPartyConfig::new("app.example", "App")
            .unwrap()
            .with_origin("https://app.example/login")
            .unwrap();
        assert_eq!(config.allowed_origins, vec!["https://app.example"]);
        assert!(!config.requires_user_verification());
        assert_eq!(
            config.supported_algorithms,
            vec![CoseAlgorithm::Es256, CoseAlgorithm::EdDsa]
        );
    }

    #[test]
    fn test_origin_keeps_port_and_dedupes() {
        let config = RelyingPartyConfig::new("localhost", "Test")
            .unwrap()
            .with_origin("http://localhost:3001")
            .unwrap()
            .with_origin("http://localhost:3001/")
            .unwrap();
        assert_eq!(config.allowed_origins, vec!["http://localhost:3001"]);
    }

    #[test]
    fn test_android_origin_kept_verbatim() {
        let origin = "android:apk-key-hash:abc123";
        let config = RelyingPartyConfig::new("app.example", "App")
            .unwrap()
            .with_origin(origin)
            .unwrap();
        assert_eq!(config.allowed_origins, vec![origin]);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            RelyingPartyConfig::new("  ", "App"),
            Err(ConfigError::EmptyRpId)
        ));
        assert!(matches!(
            RelyingPartyConfig::new("app.example", "App")
                .unwrap()
                .with_origin("not a url"),
            Err(ConfigError::InvalidOrigin(_))
        ));
        assert!("sometimes".parse::<UserVerificationRequirement>().is_err());
        assert_eq!(
            "Required".parse::<UserVerificationRequirement>().unwrap(),
            UserVerificationRequirement::Required
        );
    }

    #[test]
    fn test_config_from_env_defaults() {
        std::env::remove_var("PASSKEY_RP_ID");
        std::env::remove_var("PASSKEY_RP_ORIGINS");
        std::env::remove_var("PASSKEY_USER_VERIFICATION");
        std::env::remove_var("PASSKEY_CHALLENGE_TTL_SECS");
        std::env::remove_var("PASSKEY_TIMEOUT_MS");

        let config = RelyingPartyConfig::from_env().unwrap();
        assert_eq!(config.rp_id, "localhost");
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.challenge_ttl, Duration::from_secs(300));
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    }
}
