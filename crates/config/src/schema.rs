//! Config schema types (keys, cipher, prompt, security, logging).
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiometryConfig {
    pub keys: KeysConfig,
    pub cipher: CipherConfig,
    pub prompt: PromptConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

/// Key naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Alias used when a caller does not name a key, and by the
    /// `biometricKeysExist` / `deleteKeys` operations.
    pub default_alias: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            default_alias: "biometric_key".into(),
        }
    }
}

/// AEAD algorithm used by the in-process key vault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherAlgorithm {
    /// AES-256-GCM with a 12-byte IV, matching platform keystore keys.
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "xchacha20-poly1305")]
    XChaCha20Poly1305,
}

impl CipherAlgorithm {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::XChaCha20Poly1305 => "xchacha20-poly1305",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConfig {
    pub algorithm: CipherAlgorithm,
}

/// Defaults for prompts when a request leaves them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub prompt_message: String,
    pub cancel_button_text: String,
    pub allow_device_credentials: bool,
    /// Seconds before an unanswered prompt counts as cancelled. `None` waits
    /// for the user indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            prompt_message: "Authenticate".into(),
            cancel_button_text: "Cancel".into(),
            allow_device_credentials: false,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Require a biometric prompt before deleting a key. Off by default, so
    /// key deletion needs no proof of user presence.
    pub require_auth_for_delete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn, error).
    pub level: String,
    /// Output logs as JSON instead of human-readable.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}
