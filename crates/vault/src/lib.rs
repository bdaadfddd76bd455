//! Biometric-gated symmetric encryption envelope.
//!
//! A secret is sealed under a named 256-bit key that the [`KeyVault`] only
//! releases after the [`BiometricGate`] reports a successful ceremony, and is
//! opened under the same gate. The resulting [`CipherEnvelope`] travels as
//! `"<ivBase64>:<cipherTextBase64>"`.
//!
//! The vault and the gate are platform collaborators; [`MemoryKeyVault`] and
//! [`NoopGate`] are the in-process implementations. Trait-based [`Cipher`]
//! design allows swapping the AEAD backend.

pub mod aes256gcm;
pub mod crypto_envelope;
pub mod envelope;
pub mod error;
pub mod gate;
pub mod key_vault;
pub mod store;
pub mod traits;
pub mod xchacha20;

pub use {
    aes256gcm::Aes256GcmCipher,
    crypto_envelope::{CryptoEnvelope, EnvelopeOptions, OperationState},
    envelope::{CipherEnvelope, EnvelopeFields},
    error::{EnvelopeError, ErrorKind},
    gate::{
        AuthorizationRequest, AuthorizationTicket, Availability, BiometricGate, BiometryType,
        Direction, GateError, NoopGate, Outcome, PromptOptions, UnavailableReason,
    },
    key_vault::{KeyHandle, KeyVault, MemoryKeyVault, UnlockedCipher},
    store::EnvelopeStore,
    traits::Cipher,
    xchacha20::XChaCha20Poly1305Cipher,
};

/// Run database migrations for the envelope store.
///
/// Creates the `envelope_store` table.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<(), EnvelopeError> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await
        .map_err(|e| EnvelopeError::Database(e.into()))?;
    Ok(())
}
