//! Biometric gate: the user-presence ceremony that releases a key.
//!
//! Platform prompts report their result through a callback on the UI thread.
//! Here a ceremony is a single future that resolves exactly once, so the
//! envelope logic can be driven without a UI thread.

use std::sync::atomic::{AtomicU64, Ordering};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::key_vault::KeyHandle;

/// Kind of biometric hardware behind the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiometryType {
    #[serde(rename = "TouchID")]
    TouchId,
    #[serde(rename = "FaceID")]
    FaceId,
    Biometrics,
}

impl BiometryType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TouchId => "TouchID",
            Self::FaceId => "FaceID",
            Self::Biometrics => "Biometrics",
        }
    }
}

/// Why the gate cannot run a ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnavailableReason {
    NoHardware,
    HardwareUnavailable,
    NoneEnrolled,
    SecurityUpdateRequired,
    UnsupportedOsVersion,
    /// Platform-provided description that fits none of the above.
    Other(String),
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoHardware => f.write_str("BIOMETRIC_ERROR_NO_HARDWARE"),
            Self::HardwareUnavailable => f.write_str("BIOMETRIC_ERROR_HW_UNAVAILABLE"),
            Self::NoneEnrolled => f.write_str("BIOMETRIC_ERROR_NONE_ENROLLED"),
            Self::SecurityUpdateRequired => f.write_str("BIOMETRIC_ERROR_SECURITY_UPDATE_REQUIRED"),
            Self::UnsupportedOsVersion => f.write_str("Unsupported OS version"),
            Self::Other(message) => f.write_str(message),
        }
    }
}

/// Result of an availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
    pub biometry_type: Option<BiometryType>,
    pub reason: Option<UnavailableReason>,
}

impl Availability {
    #[must_use]
    pub fn available(biometry_type: BiometryType) -> Self {
        Self {
            available: true,
            biometry_type: Some(biometry_type),
            reason: None,
        }
    }

    #[must_use]
    pub fn unavailable(reason: UnavailableReason) -> Self {
        Self {
            available: false,
            biometry_type: None,
            reason: Some(reason),
        }
    }
}

/// Text and policy for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOptions {
    pub prompt_message: String,
    pub cancel_button_text: String,
    /// Accept the device passcode/PIN as an alternative to biometrics.
    pub allow_device_credentials: bool,
}

impl PromptOptions {
    #[must_use]
    pub fn new(prompt_message: impl Into<String>) -> Self {
        Self {
            prompt_message: prompt_message.into(),
            cancel_button_text: "Cancel".into(),
            allow_device_credentials: false,
        }
    }

    #[must_use]
    pub fn with_cancel_button(mut self, text: impl Into<String>) -> Self {
        self.cancel_button_text = text.into();
        self
    }

    #[must_use]
    pub fn with_device_credentials(mut self, allow: bool) -> Self {
        self.allow_device_credentials = allow;
        self
    }

    /// Text for the prompt's negative button.
    ///
    /// `None` when device credentials are allowed: the credential fallback
    /// replaces the negative button on platform prompts.
    #[must_use]
    pub fn negative_button(&self) -> Option<&str> {
        if self.allow_device_credentials {
            None
        } else {
            Some(&self.cancel_button_text)
        }
    }
}

/// The cipher operation an authorization is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    /// Decrypt with the IV that was produced alongside the cipher text.
    Decrypt { iv: Vec<u8> },
}

impl Direction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt { .. } => "decrypt",
        }
    }
}

static NEXT_CHALLENGE: AtomicU64 = AtomicU64::new(1);

/// What the envelope asks the gate to authorize.
///
/// Only [`CryptoEnvelope`](crate::CryptoEnvelope) creates requests, and each
/// carries a fresh challenge. A request is not `Clone` and its binding is
/// read-only, so a gate can turn it into at most one ticket for exactly what
/// was asked. Outside this crate a request cannot be built:
///
/// ```compile_fail
/// use biometry_vault::{AuthorizationRequest, Direction, KeyHandle, PromptOptions};
///
/// let request = AuthorizationRequest {
///     key: KeyHandle::new("k1"),
///     direction: Direction::Encrypt,
///     prompt: PromptOptions::new("Unlock"),
/// };
/// ```
#[derive(Debug)]
pub struct AuthorizationRequest {
    key: KeyHandle,
    direction: Direction,
    prompt: PromptOptions,
    challenge: u64,
}

impl AuthorizationRequest {
    pub(crate) fn new(key: KeyHandle, direction: Direction, prompt: PromptOptions) -> Self {
        Self {
            key,
            direction,
            prompt,
            challenge: NEXT_CHALLENGE.fetch_add(1, Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn key(&self) -> &KeyHandle {
        &self.key
    }

    #[must_use]
    pub fn direction(&self) -> &Direction {
        &self.direction
    }

    /// Prompt to show for this ceremony.
    #[must_use]
    pub fn prompt(&self) -> &PromptOptions {
        &self.prompt
    }

    pub(crate) fn challenge(&self) -> u64 {
        self.challenge
    }
}

/// Single-use proof that the user passed a ceremony for one cipher operation.
///
/// Not `Clone`: unlocking a cipher consumes it.
#[derive(Debug)]
pub struct AuthorizationTicket {
    key: KeyHandle,
    direction: Direction,
    challenge: u64,
}

impl AuthorizationTicket {
    /// Issue the ticket for `request`, consuming it. Called by gate
    /// implementations once the ceremony succeeds.
    #[must_use]
    pub fn grant(request: AuthorizationRequest) -> Self {
        Self {
            key: request.key,
            direction: request.direction,
            challenge: request.challenge,
        }
    }

    /// Whether this ticket answers the request that carried `challenge`.
    pub(crate) fn answers(&self, challenge: u64) -> bool {
        self.challenge == challenge
    }

    #[must_use]
    pub fn key(&self) -> &KeyHandle {
        &self.key
    }

    #[must_use]
    pub fn direction(&self) -> &Direction {
        &self.direction
    }

    #[must_use]
    pub fn into_parts(self) -> (KeyHandle, Direction) {
        (self.key, self.direction)
    }
}

/// Result of a gated operation that the user may decline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    /// The user dismissed the prompt or pressed the negative button.
    Cancelled,
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Cancelled => Outcome::Cancelled,
        }
    }
}

/// Ceremony failures other than cancellation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("biometric sensor unavailable: {0}")]
    Unavailable(UnavailableReason),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("{0}")]
    Platform(String),
}

/// Device-local authentication ceremony.
///
/// Implementations present the prompt exactly once per call and never retry
/// internally; the platform's own attempt counting and lockout apply.
#[async_trait]
pub trait BiometricGate: Send + Sync {
    /// Whether a ceremony can currently run.
    fn availability(&self, allow_device_credentials: bool) -> Availability;

    /// Show a prompt that is not bound to any key.
    async fn prompt(&self, options: &PromptOptions) -> Result<Outcome<()>, GateError>;

    /// Show a prompt bound to one cipher operation and issue a ticket on success.
    async fn authorize(
        &self,
        request: AuthorizationRequest,
    ) -> Result<Outcome<AuthorizationTicket>, GateError>;
}

/// Gate for devices with no biometric support. Every ceremony fails as
/// unavailable.
pub struct NoopGate;

#[async_trait]
impl BiometricGate for NoopGate {
    fn availability(&self, _allow_device_credentials: bool) -> Availability {
        Availability::unavailable(UnavailableReason::NoHardware)
    }

    async fn prompt(&self, _options: &PromptOptions) -> Result<Outcome<()>, GateError> {
        Err(GateError::Unavailable(UnavailableReason::NoHardware))
    }

    async fn authorize(
        &self,
        _request: AuthorizationRequest,
    ) -> Result<Outcome<AuthorizationTicket>, GateError> {
        Err(GateError::Unavailable(UnavailableReason::NoHardware))
    }
}
