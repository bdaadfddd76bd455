//! Request and result shapes exchanged with the application layer.
//!
//! Field names are camelCase on the wire. Optional prompt fields fall back to
//! the `[prompt]` section of the loaded config.

use {
    biometry_config::PromptConfig,
    biometry_vault::{Availability, BiometryType, ErrorKind, PromptOptions},
    serde::{Deserialize, Serialize},
};

/// Error string reported when the user dismisses a prompt.
pub const USER_CANCELLATION: &str = "User cancellation";

// ── Requests ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorRequest {
    #[serde(default)]
    pub allow_device_credentials: bool,
}

/// Prompt text and policy. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt_message: Option<String>,
    #[serde(default)]
    pub cancel_button_text: Option<String>,
    #[serde(default)]
    pub allow_device_credentials: Option<bool>,
}

impl PromptRequest {
    /// Fill the gaps from `defaults`.
    #[must_use]
    pub fn resolve(&self, defaults: &PromptConfig) -> PromptOptions {
        let message = self
            .prompt_message
            .clone()
            .unwrap_or_else(|| defaults.prompt_message.clone());
        let cancel = self
            .cancel_button_text
            .clone()
            .unwrap_or_else(|| defaults.cancel_button_text.clone());
        let allow = self
            .allow_device_credentials
            .unwrap_or(defaults.allow_device_credentials);

        PromptOptions::new(message)
            .with_cancel_button(cancel)
            .with_device_credentials(allow)
    }
}

pub type SimplePromptRequest = PromptRequest;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealRequest {
    /// Defaults to the configured key alias.
    #[serde(default)]
    pub key_name: Option<String>,
    #[serde(flatten)]
    pub prompt: PromptRequest,
    #[serde(alias = "payload")]
    pub plaintext: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRequest {
    /// Defaults to the configured key alias.
    #[serde(default)]
    pub key_name: Option<String>,
    #[serde(flatten)]
    pub prompt: PromptRequest,
    /// `"<ivBase64>:<cipherTextBase64>"`
    pub encrypted_envelope: String,
}

// ── Results ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorAvailableResult {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biometry_type: Option<BiometryType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Availability> for SensorAvailableResult {
    fn from(availability: Availability) -> Self {
        Self {
            available: availability.available,
            biometry_type: availability.biometry_type,
            error: availability.reason.map(|reason| reason.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplePromptResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_envelope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plaintext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysExistResult {
    pub keys_exist: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysDeletedResult {
    pub keys_deleted: bool,
}

// ── Errors ─────────────────────────────────────────────────────────────────

/// Failure reported to the application: a stable machine-readable `code` plus
/// a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct BridgeError {
    pub code: String,
    pub message: String,
}

impl BridgeError {
    pub const INVALID_REQUEST: &'static str = "INVALID_REQUEST";
    pub const UNKNOWN_METHOD: &'static str = "UNKNOWN_METHOD";

    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        serde_json::from_value(serde_json::Value::String(self.code.clone())).ok()
    }
}

impl From<biometry_vault::EnvelopeError> for BridgeError {
    fn from(error: biometry_vault::EnvelopeError) -> Self {
        Self::new(error.kind().as_str(), error.to_string())
    }
}
