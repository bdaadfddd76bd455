//! XChaCha20-Poly1305 implementation of the [`Cipher`] trait.

#[allow(deprecated)] // upstream generic-array 0.x deprecation
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;

use crate::{envelope::CipherEnvelope, error::EnvelopeError, traits::Cipher};

/// Algorithm identifier.
pub const NAME: &str = "xchacha20-poly1305";

/// Nonce size for XChaCha20-Poly1305 (24 bytes).
const NONCE_LEN: usize = 24;

/// Poly1305 tag length.
const TAG_LEN: usize = 16;

/// XChaCha20-Poly1305 AEAD cipher.
///
/// The extended 24-byte nonce makes random nonces safe for very long-lived
/// keys. Cipher text carries the Poly1305 tag as its last 16 bytes.
pub struct XChaCha20Poly1305Cipher;

impl Cipher for XChaCha20Poly1305Cipher {
    fn name(&self) -> &'static str {
        NAME
    }

    fn iv_len(&self) -> usize {
        NONCE_LEN
    }

    #[allow(deprecated)]
    fn encrypt(&self, key: &[u8; 32], plaintext: &[u8]) -> Result<CipherEnvelope, EnvelopeError> {
        let cipher = XChaCha20Poly1305::new(key.into());

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let cipher_text = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| EnvelopeError::Cipher(e.to_string()))?;

        Ok(CipherEnvelope::new(cipher_text, nonce_bytes.to_vec()))
    }

    #[allow(deprecated)]
    fn decrypt(
        &self,
        key: &[u8; 32],
        iv: &[u8],
        cipher_text: &[u8],
    ) -> Result<Vec<u8>, EnvelopeError> {
        if iv.len() != NONCE_LEN || cipher_text.len() < TAG_LEN {
            return Err(EnvelopeError::DecryptionFailed);
        }

        let nonce = XNonce::from_slice(iv);
        let cipher = XChaCha20Poly1305::new(key.into());

        cipher
            .decrypt(nonce, cipher_text)
            .map_err(|_| EnvelopeError::DecryptionFailed)
    }
}
