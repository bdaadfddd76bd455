//! Envelope error types.

use serde::{Deserialize, Serialize};

use crate::gate::{GateError, UnavailableReason};

/// Errors produced by envelope operations.
///
/// A user cancelling the prompt is not an error; it is reported as
/// [`Outcome::Cancelled`](crate::gate::Outcome::Cancelled).
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// No usable biometric sensor or device credential.
    #[error("biometric sensor unavailable: {0}")]
    SensorUnavailable(UnavailableReason),

    /// The ceremony completed but the user was not recognised.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No key is stored under the requested name.
    #[error("no key named {0:?}")]
    KeyNotFound(String),

    /// The transport string could not be parsed.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Wrong key, wrong IV, tampered bytes, or output that is not UTF-8.
    ///
    /// Deliberately carries no detail so callers can't tell the cases apart.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Another authentication prompt is currently showing.
    #[error("an authentication prompt is already showing")]
    PromptInProgress,

    /// The biometric platform reported an unexpected failure.
    #[error("biometric platform error: {0}")]
    Platform(String),

    /// The key vault backend failed or rejected the ticket.
    #[error("key vault error: {0}")]
    Vault(String),

    /// Encryption failed inside the cipher.
    #[error("cipher error: {0}")]
    Cipher(String),

    /// Database error from the envelope store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Machine-readable error kind, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    SensorUnavailable,
    UserCancelled,
    AuthenticationFailed,
    KeyNotFound,
    MalformedEnvelope,
    DecodeError,
    PromptInProgress,
    PlatformError,
    VaultError,
    CipherError,
    StorageError,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SensorUnavailable => "SENSOR_UNAVAILABLE",
            Self::UserCancelled => "USER_CANCELLED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::KeyNotFound => "KEY_NOT_FOUND",
            Self::MalformedEnvelope => "MALFORMED_ENVELOPE",
            Self::DecodeError => "DECODE_ERROR",
            Self::PromptInProgress => "PROMPT_IN_PROGRESS",
            Self::PlatformError => "PLATFORM_ERROR",
            Self::VaultError => "VAULT_ERROR",
            Self::CipherError => "CIPHER_ERROR",
            Self::StorageError => "STORAGE_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EnvelopeError {
    /// The machine-readable kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SensorUnavailable(_) => ErrorKind::SensorUnavailable,
            Self::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            Self::KeyNotFound(_) => ErrorKind::KeyNotFound,
            Self::MalformedEnvelope(_) => ErrorKind::MalformedEnvelope,
            Self::DecryptionFailed => ErrorKind::DecodeError,
            Self::PromptInProgress => ErrorKind::PromptInProgress,
            Self::Platform(_) => ErrorKind::PlatformError,
            Self::Vault(_) => ErrorKind::VaultError,
            Self::Cipher(_) => ErrorKind::CipherError,
            Self::Database(_) | Self::Json(_) => ErrorKind::StorageError,
        }
    }
}

impl From<GateError> for EnvelopeError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unavailable(reason) => Self::SensorUnavailable(reason),
            GateError::AuthenticationFailed(message) => Self::AuthenticationFailed(message),
            GateError::Platform(message) => Self::Platform(message),
        }
    }
}
