//! Envelope state machine: seal and open secrets behind a biometric gate.
//!
//! Each operation runs `Idle -> AwaitingAuthorization -> Authorized ->
//! Completed`, or ends in `Cancelled`/`Failed`. Nothing is kept between
//! operations except the vault's keys.

use std::{future::Future, sync::Arc, time::Duration};

use {
    tokio::sync::{Mutex, MutexGuard},
    zeroize::Zeroize,
};

use crate::{
    envelope::{self, CipherEnvelope},
    error::EnvelopeError,
    gate::{
        AuthorizationRequest, AuthorizationTicket, Availability, BiometricGate, Direction,
        GateError, Outcome, PromptOptions,
    },
    key_vault::KeyVault,
};

/// Behaviour switches for [`CryptoEnvelope`].
#[derive(Debug, Clone, Default)]
pub struct EnvelopeOptions {
    /// Require a successful prompt before a key is deleted.
    ///
    /// Off by default: without it, anyone able to call [`CryptoEnvelope::delete_key`]
    /// can destroy a key (and with it every envelope sealed under it) without
    /// proving user presence.
    pub require_auth_for_delete: bool,
    /// Treat a ceremony that has not finished within this time as cancelled.
    pub authorization_timeout: Option<Duration>,
}

/// Per-operation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    AwaitingAuthorization,
    Authorized,
    Completed,
    Cancelled,
    Failed,
}

impl OperationState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingAuthorization => "awaiting_authorization",
            Self::Authorized => "authorized",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

const OP_SEAL: &str = "seal";
const OP_OPEN: &str = "open";
const OP_DELETE: &str = "delete_key";
const OP_PROMPT: &str = "simple_prompt";

/// Seals and opens secrets under named keys, one ceremony at a time.
pub struct CryptoEnvelope {
    vault: Arc<dyn KeyVault>,
    gate: Arc<dyn BiometricGate>,
    options: EnvelopeOptions,
    /// Held for the whole of any operation that shows a prompt.
    ceremony: Mutex<()>,
}

impl CryptoEnvelope {
    #[must_use]
    pub fn new(vault: Arc<dyn KeyVault>, gate: Arc<dyn BiometricGate>) -> Self {
        Self::with_options(vault, gate, EnvelopeOptions::default())
    }

    #[must_use]
    pub fn with_options(
        vault: Arc<dyn KeyVault>,
        gate: Arc<dyn BiometricGate>,
        options: EnvelopeOptions,
    ) -> Self {
        Self {
            vault,
            gate,
            options,
            ceremony: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn options(&self) -> &EnvelopeOptions {
        &self.options
    }

    /// Query the gate without showing anything.
    #[must_use]
    pub fn availability(&self, allow_device_credentials: bool) -> Availability {
        self.gate.availability(allow_device_credentials)
    }

    /// Show a prompt that is not bound to a key.
    pub async fn simple_prompt(
        &self,
        prompt: &PromptOptions,
    ) -> Result<Outcome<()>, EnvelopeError> {
        let _ceremony = self.begin(OP_PROMPT)?;
        let result = self.bounded(self.gate.prompt(prompt)).await;
        finish(OP_PROMPT, "", &result);
        result
    }

    /// Encrypt `plaintext` under the key named `key_name`, creating the key
    /// if it does not exist yet.
    pub async fn seal(
        &self,
        key_name: &str,
        prompt: &PromptOptions,
        plaintext: &str,
    ) -> Result<Outcome<CipherEnvelope>, EnvelopeError> {
        let _ceremony = self.begin(OP_SEAL)?;
        let result = self.seal_inner(key_name, prompt, plaintext).await;
        finish(OP_SEAL, key_name, &result);
        result
    }

    /// [`seal`](Self::seal), returning the joined wire string.
    pub async fn seal_to_string(
        &self,
        key_name: &str,
        prompt: &PromptOptions,
        plaintext: &str,
    ) -> Result<Outcome<String>, EnvelopeError> {
        let sealed = self.seal(key_name, prompt, plaintext).await?;
        Ok(sealed.map(|envelope| envelope::encode(&envelope)))
    }

    /// Decrypt `envelope` with the key named `key_name`.
    ///
    /// Never creates a key: a missing key is [`EnvelopeError::KeyNotFound`].
    pub async fn open(
        &self,
        key_name: &str,
        prompt: &PromptOptions,
        envelope: CipherEnvelope,
    ) -> Result<Outcome<String>, EnvelopeError> {
        let _ceremony = self.begin(OP_OPEN)?;
        let result = self.open_inner(key_name, prompt, envelope).await;
        finish(OP_OPEN, key_name, &result);
        result
    }

    /// [`open`](Self::open) for a joined wire string. A malformed string fails
    /// before any prompt is shown.
    pub async fn open_from_string(
        &self,
        key_name: &str,
        prompt: &PromptOptions,
        wire: &str,
    ) -> Result<Outcome<String>, EnvelopeError> {
        let envelope = envelope::decode(wire)?;
        self.open(key_name, prompt, envelope).await
    }

    /// Delete the key named `key_name`. Returns whether a key was removed.
    ///
    /// Only prompts when [`EnvelopeOptions::require_auth_for_delete`] is set
    /// and a key actually exists.
    pub async fn delete_key(
        &self,
        key_name: &str,
        prompt: &PromptOptions,
    ) -> Result<Outcome<bool>, EnvelopeError> {
        if !self.options.require_auth_for_delete {
            let deleted = self.vault.delete(key_name).await?;
            return Ok(Outcome::Completed(deleted));
        }

        let _ceremony = self.begin(OP_DELETE)?;
        let result = self.delete_inner(key_name, prompt).await;
        finish(OP_DELETE, key_name, &result);
        result
    }

    /// Whether a key named `key_name` exists. No prompt, no side effects.
    pub async fn key_exists(&self, key_name: &str) -> Result<bool, EnvelopeError> {
        self.vault.contains(key_name).await
    }

    async fn seal_inner(
        &self,
        key_name: &str,
        prompt: &PromptOptions,
        plaintext: &str,
    ) -> Result<Outcome<CipherEnvelope>, EnvelopeError> {
        let key = self.vault.get_or_create(key_name).await?;

        let request = AuthorizationRequest::new(key, Direction::Encrypt, prompt.clone());
        let Outcome::Completed(ticket) = self.authorize(key_name, request).await? else {
            return Ok(Outcome::Cancelled);
        };

        let cipher = self.vault.unlock(ticket).await?;
        let envelope = cipher.encrypt(plaintext.as_bytes())?;
        Ok(Outcome::Completed(envelope))
    }

    async fn open_inner(
        &self,
        key_name: &str,
        prompt: &PromptOptions,
        envelope: CipherEnvelope,
    ) -> Result<Outcome<String>, EnvelopeError> {
        let key = self
            .vault
            .get(key_name)
            .await?
            .ok_or_else(|| EnvelopeError::KeyNotFound(key_name.to_string()))?;

        let CipherEnvelope {
            cipher_text,
            initialization_vector,
        } = envelope;

        // A wrong IV is not detected here; decryption rejects it below.
        let request = AuthorizationRequest::new(
            key,
            Direction::Decrypt {
                iv: initialization_vector,
            },
            prompt.clone(),
        );
        let Outcome::Completed(ticket) = self.authorize(key_name, request).await? else {
            return Ok(Outcome::Cancelled);
        };

        let cipher = self.vault.unlock(ticket).await?;
        let bytes = cipher.decrypt(&cipher_text)?;
        let plaintext = String::from_utf8(bytes).map_err(|err| {
            let mut bytes = err.into_bytes();
            bytes.zeroize();
            EnvelopeError::DecryptionFailed
        })?;
        Ok(Outcome::Completed(plaintext))
    }

    async fn delete_inner(
        &self,
        key_name: &str,
        prompt: &PromptOptions,
    ) -> Result<Outcome<bool>, EnvelopeError> {
        if !self.vault.contains(key_name).await? {
            return Ok(Outcome::Completed(false));
        }

        transition(OP_DELETE, key_name, OperationState::AwaitingAuthorization);
        if self.bounded(self.gate.prompt(prompt)).await?.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        transition(OP_DELETE, key_name, OperationState::Authorized);

        let deleted = self.vault.delete(key_name).await?;
        Ok(Outcome::Completed(deleted))
    }

    async fn authorize(
        &self,
        key_name: &str,
        request: AuthorizationRequest,
    ) -> Result<Outcome<AuthorizationTicket>, EnvelopeError> {
        let operation = match request.direction() {
            Direction::Encrypt => OP_SEAL,
            Direction::Decrypt { .. } => OP_OPEN,
        };
        let challenge = request.challenge();
        transition(operation, key_name, OperationState::AwaitingAuthorization);

        let outcome = self.bounded(self.gate.authorize(request)).await?;
        if let Outcome::Completed(ticket) = &outcome {
            // A gate may only answer the request it was handed just now.
            if !ticket.answers(challenge) {
                return Err(EnvelopeError::Vault(
                    "gate returned a ticket for a different request".into(),
                ));
            }
            transition(operation, key_name, OperationState::Authorized);
        }
        Ok(outcome)
    }

    /// Await a ceremony, applying the configured timeout.
    async fn bounded<T>(
        &self,
        ceremony: impl Future<Output = Result<Outcome<T>, GateError>>,
    ) -> Result<Outcome<T>, EnvelopeError> {
        let Some(limit) = self.options.authorization_timeout else {
            return Ok(ceremony.await?);
        };
        match tokio::time::timeout(limit, ceremony).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(timeout = ?limit, "authorization timed out");
                Ok(Outcome::Cancelled)
            },
        }
    }

    /// Claim the single ceremony slot, failing fast if a prompt is showing.
    fn begin(&self, operation: &'static str) -> Result<MutexGuard<'_, ()>, EnvelopeError> {
        let guard = self.ceremony.try_lock().map_err(|_| {
            #[cfg(feature = "tracing")]
            tracing::warn!(operation, "rejected: authentication prompt already showing");
            record_outcome(operation, "rejected");
            EnvelopeError::PromptInProgress
        })?;
        transition(operation, "", OperationState::Idle);
        Ok(guard)
    }
}

fn finish<T>(operation: &'static str, key_name: &str, result: &Result<Outcome<T>, EnvelopeError>) {
    let state = match result {
        Ok(Outcome::Completed(_)) => OperationState::Completed,
        Ok(Outcome::Cancelled) => OperationState::Cancelled,
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(operation, key = key_name, kind = %_err.kind(), "envelope operation failed");
            OperationState::Failed
        },
    };
    transition(operation, key_name, state);
    record_outcome(operation, state.as_str());
}

#[cfg(feature = "tracing")]
fn transition(operation: &'static str, key_name: &str, state: OperationState) {
    tracing::debug!(operation, key = key_name, state = state.as_str(), "envelope state");
}

#[cfg(not(feature = "tracing"))]
fn transition(_operation: &'static str, _key_name: &str, _state: OperationState) {}

#[cfg(feature = "metrics")]
fn record_outcome(operation: &'static str, outcome: &'static str) {
    metrics::counter!(
        "biometry_envelope_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

#[cfg(not(feature = "metrics"))]
fn record_outcome(_operation: &'static str, _outcome: &'static str) {}
