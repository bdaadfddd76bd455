//! AES-256-GCM implementation of the [`Cipher`] trait.
//!
//! This matches the key parameters platform keystores use for biometric-bound
//! keys: AES with a 256-bit key, GCM block mode, no padding, a 12-byte IV and
//! a 128-bit authentication tag. Envelopes sealed by a platform keystore can
//! therefore be opened by this backend given the same key, and vice versa.

#[allow(deprecated)] // upstream generic-array 0.x deprecation
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;

use crate::{envelope::CipherEnvelope, error::EnvelopeError, traits::Cipher};

/// Algorithm identifier.
pub const NAME: &str = "aes-256-gcm";

/// GCM initialization vector length.
pub const IV_LEN: usize = 12;

/// GCM authentication tag length (128 bits).
pub const TAG_LEN: usize = 16;

/// AES-256-GCM AEAD cipher. Cipher text layout: `[ciphertext][tag: 16 bytes]`.
pub struct Aes256GcmCipher;

impl Cipher for Aes256GcmCipher {
    fn name(&self) -> &'static str {
        NAME
    }

    fn iv_len(&self) -> usize {
        IV_LEN
    }

    #[allow(deprecated)]
    fn encrypt(&self, key: &[u8; 32], plaintext: &[u8]) -> Result<CipherEnvelope, EnvelopeError> {
        let cipher = Aes256Gcm::new(key.into());

        let mut iv = [0u8; IV_LEN];
        rand::rng().fill_bytes(&mut iv);

        let cipher_text = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|e| EnvelopeError::Cipher(e.to_string()))?;

        Ok(CipherEnvelope::new(cipher_text, iv.to_vec()))
    }

    #[allow(deprecated)]
    fn decrypt(
        &self,
        key: &[u8; 32],
        iv: &[u8],
        cipher_text: &[u8],
    ) -> Result<Vec<u8>, EnvelopeError> {
        if iv.len() != IV_LEN || cipher_text.len() < TAG_LEN {
            return Err(EnvelopeError::DecryptionFailed);
        }

        let cipher = Aes256Gcm::new(key.into());
        cipher
            .decrypt(Nonce::from_slice(iv), cipher_text)
            .map_err(|_| EnvelopeError::DecryptionFailed)
    }
}
