//! Cipher trait for swappable authenticated encryption backends.

use crate::{envelope::CipherEnvelope, error::EnvelopeError};

/// Trait for authenticated encryption used by software key vaults.
///
/// Implementations choose the initialization vector themselves: callers never
/// supply one for encryption, so an IV can't be reused by mistake.
pub trait Cipher: Send + Sync {
    /// Algorithm identifier, e.g. `"aes-256-gcm"`.
    fn name(&self) -> &'static str;

    /// Length in bytes of the initialization vector this cipher requires.
    fn iv_len(&self) -> usize;

    /// Encrypt `plaintext` under `key` with a freshly generated IV.
    fn encrypt(&self, key: &[u8; 32], plaintext: &[u8]) -> Result<CipherEnvelope, EnvelopeError>;

    /// Decrypt `cipher_text` produced alongside `iv` under `key`.
    ///
    /// Any failure (wrong key, wrong IV, tampered bytes) is reported as
    /// [`EnvelopeError::DecryptionFailed`] without further detail.
    fn decrypt(
        &self,
        key: &[u8; 32],
        iv: &[u8],
        cipher_text: &[u8],
    ) -> Result<Vec<u8>, EnvelopeError>;
}
