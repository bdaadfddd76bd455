//! Named symmetric keys and the ciphers they unlock.
//!
//! A [`KeyVault`] never hands out key material. After a ceremony it returns an
//! [`UnlockedCipher`] that performs exactly one operation in the direction the
//! [`AuthorizationTicket`] was issued for.

use std::{collections::HashMap, sync::Arc};

use {
    async_trait::async_trait,
    rand::RngCore,
    tokio::sync::RwLock,
    zeroize::Zeroizing,
};

use crate::{
    aes256gcm::Aes256GcmCipher,
    envelope::CipherEnvelope,
    error::EnvelopeError,
    gate::{AuthorizationTicket, Direction},
    traits::Cipher,
};

/// Name of a key held by a vault.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyHandle {
    name: String,
}

impl KeyHandle {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A cipher released by a successful ceremony. Consumed by its one operation.
pub trait UnlockedCipher: Send {
    /// The direction this cipher was authorized for.
    fn direction(&self) -> &Direction;

    /// Encrypt with a fresh IV. Fails if the cipher was authorized for decryption.
    fn encrypt(self: Box<Self>, plaintext: &[u8]) -> Result<CipherEnvelope, EnvelopeError>;

    /// Decrypt with the IV bound at authorization. Fails if the cipher was
    /// authorized for encryption.
    fn decrypt(self: Box<Self>, cipher_text: &[u8]) -> Result<Vec<u8>, EnvelopeError>;
}

/// Secure storage for named symmetric keys.
///
/// Get-or-create and delete must be atomic with respect to each other. At
/// most one key exists per name.
#[async_trait]
pub trait KeyVault: Send + Sync {
    /// Return the key named `name`, generating it first if absent.
    async fn get_or_create(&self, name: &str) -> Result<KeyHandle, EnvelopeError>;

    /// Return the key named `name` if present. Never creates.
    async fn get(&self, name: &str) -> Result<Option<KeyHandle>, EnvelopeError>;

    async fn contains(&self, name: &str) -> Result<bool, EnvelopeError>;

    /// Delete the key named `name`. Returns whether a key was removed.
    async fn delete(&self, name: &str) -> Result<bool, EnvelopeError>;

    /// Exchange a ticket for a single-use cipher bound to the ticket's key.
    ///
    /// Tickets only come from a gate answering an
    /// [`AuthorizationRequest`](crate::gate::AuthorizationRequest)
    /// minted by this crate, so no caller can unlock without a ceremony.
    async fn unlock(
        &self,
        ticket: AuthorizationTicket,
    ) -> Result<Box<dyn UnlockedCipher>, EnvelopeError>;
}

/// In-process key vault holding 256-bit keys in zeroizing memory.
///
/// Generic over [`Cipher`] but defaults to [`Aes256GcmCipher`]. Keys live only
/// as long as the vault; platform integrations supply their own [`KeyVault`]
/// backed by the OS keystore.
pub struct MemoryKeyVault<C: Cipher = Aes256GcmCipher> {
    cipher: Arc<C>,
    keys: RwLock<HashMap<String, Zeroizing<[u8; 32]>>>,
}

impl MemoryKeyVault<Aes256GcmCipher> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_cipher(Aes256GcmCipher)
    }
}

impl Default for MemoryKeyVault<Aes256GcmCipher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Cipher> MemoryKeyVault<C> {
    #[must_use]
    pub fn with_cipher(cipher: C) -> Self {
        Self {
            cipher: Arc::new(cipher),
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Name of the cipher keys in this vault are used with.
    #[must_use]
    pub fn cipher_name(&self) -> &'static str {
        self.cipher.name()
    }
}

#[async_trait]
impl<C: Cipher + 'static> KeyVault for MemoryKeyVault<C> {
    async fn get_or_create(&self, name: &str) -> Result<KeyHandle, EnvelopeError> {
        let mut keys = self.keys.write().await;
        if !keys.contains_key(name) {
            let mut key = Zeroizing::new([0u8; 32]);
            rand::rng().fill_bytes(key.as_mut());
            keys.insert(name.to_string(), key);

            #[cfg(feature = "tracing")]
            tracing::info!(key = name, cipher = self.cipher.name(), "generated key");
        }
        Ok(KeyHandle::new(name))
    }

    async fn get(&self, name: &str) -> Result<Option<KeyHandle>, EnvelopeError> {
        let keys = self.keys.read().await;
        Ok(keys.contains_key(name).then(|| KeyHandle::new(name)))
    }

    async fn contains(&self, name: &str) -> Result<bool, EnvelopeError> {
        Ok(self.keys.read().await.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool, EnvelopeError> {
        let removed = self.keys.write().await.remove(name).is_some();

        #[cfg(feature = "tracing")]
        if removed {
            tracing::info!(key = name, "deleted key");
        }

        Ok(removed)
    }

    async fn unlock(
        &self,
        ticket: AuthorizationTicket,
    ) -> Result<Box<dyn UnlockedCipher>, EnvelopeError> {
        let (handle, direction) = ticket.into_parts();
        let key = self
            .keys
            .read()
            .await
            .get(handle.name())
            .cloned()
            .ok_or_else(|| EnvelopeError::KeyNotFound(handle.name().to_string()))?;

        Ok(Box::new(SoftwareCipher {
            cipher: Arc::clone(&self.cipher),
            key,
            direction,
        }))
    }
}

/// [`UnlockedCipher`] over a key copy held in zeroizing memory.
struct SoftwareCipher<C: Cipher> {
    cipher: Arc<C>,
    key: Zeroizing<[u8; 32]>,
    direction: Direction,
}

impl<C: Cipher> UnlockedCipher for SoftwareCipher<C> {
    fn direction(&self) -> &Direction {
        &self.direction
    }

    fn encrypt(self: Box<Self>, plaintext: &[u8]) -> Result<CipherEnvelope, EnvelopeError> {
        match self.direction {
            Direction::Encrypt => self.cipher.encrypt(&self.key, plaintext),
            Direction::Decrypt { .. } => Err(EnvelopeError::Vault(
                "cipher was authorized for decryption".into(),
            )),
        }
    }

    fn decrypt(self: Box<Self>, cipher_text: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        match &self.direction {
            Direction::Decrypt { iv } => self.cipher.decrypt(&self.key, iv, cipher_text),
            Direction::Encrypt => Err(EnvelopeError::Vault(
                "cipher was authorized for encryption".into(),
            )),
        }
    }
}
