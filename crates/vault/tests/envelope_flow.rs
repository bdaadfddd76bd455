#![allow(clippy::unwrap_used, clippy::expect_used)]
use std::sync::Arc;

use {
    async_trait::async_trait,
    biometry_vault::{
        AuthorizationRequest, AuthorizationTicket, Availability, BiometricGate, BiometryType,
        CipherEnvelope, CryptoEnvelope, EnvelopeError, EnvelopeStore, ErrorKind, GateError,
        MemoryKeyVault, Outcome, PromptOptions, XChaCha20Poly1305Cipher, envelope,
    },
};

/// Gate that approves every ceremony, standing in for a user who always
/// presents the right finger.
struct ApprovingGate;

#[async_trait]
impl BiometricGate for ApprovingGate {
    fn availability(&self, _allow_device_credentials: bool) -> Availability {
        Availability::available(BiometryType::TouchId)
    }

    async fn prompt(&self, _options: &PromptOptions) -> Result<Outcome<()>, GateError> {
        Ok(Outcome::Completed(()))
    }

    async fn authorize(
        &self,
        request: AuthorizationRequest,
    ) -> Result<Outcome<AuthorizationTicket>, GateError> {
        Ok(Outcome::Completed(AuthorizationTicket::grant(request)))
    }
}

fn crypto_envelope() -> CryptoEnvelope {
    CryptoEnvelope::new(Arc::new(MemoryKeyVault::new()), Arc::new(ApprovingGate))
}

fn prompt() -> PromptOptions {
    PromptOptions::new("Sign in").with_cancel_button("Use password")
}

async fn seal(envelope: &CryptoEnvelope, key: &str, plaintext: &str) -> CipherEnvelope {
    envelope
        .seal(key, &prompt(), plaintext)
        .await
        .unwrap()
        .completed()
        .expect("approved")
}

async fn open(envelope: &CryptoEnvelope, key: &str, sealed: CipherEnvelope) -> Result<String, EnvelopeError> {
    envelope
        .open(key, &prompt(), sealed)
        .await
        .map(|outcome| outcome.completed().expect("approved"))
}

#[tokio::test]
async fn round_trip_plaintexts() {
    let envelope = crypto_envelope();
    let long = "x".repeat(10_000);
    for plaintext in ["", "hello", "pässwörd ✓", "日本語のテキスト", "🔐🔑", long.as_str()] {
        let sealed = seal(&envelope, "k1", plaintext).await;
        assert_eq!(open(&envelope, "k1", sealed).await.unwrap(), plaintext);
    }
}

#[tokio::test]
async fn scenario_seal_wire_open() {
    let envelope = crypto_envelope();

    let wire = envelope
        .seal_to_string("k1", &prompt(), "hello")
        .await
        .unwrap()
        .completed()
        .unwrap();
    let (iv, cipher_text) = wire.split_once(':').unwrap();
    assert_eq!(iv.len(), 16); // 12 bytes of IV
    assert!(!cipher_text.is_empty());

    let opened = envelope.open_from_string("k1", &prompt(), &wire).await.unwrap();
    assert_eq!(opened, Outcome::Completed("hello".to_string()));
}

#[tokio::test]
async fn scenario_open_unknown_key() {
    let envelope = crypto_envelope();
    let err = envelope
        .open_from_string("k1", &prompt(), "AAAA:BBBB")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyNotFound);
    assert!(!envelope.key_exists("k1").await.unwrap());
}

#[tokio::test]
async fn successive_seals_use_fresh_ivs() {
    let envelope = crypto_envelope();
    let first = seal(&envelope, "k1", "same").await;
    let second = seal(&envelope, "k1", "same").await;

    assert_ne!(first.initialization_vector, second.initialization_vector);
    assert_ne!(first.cipher_text, second.cipher_text);
}

#[tokio::test]
async fn every_flipped_byte_is_detected() {
    let envelope = crypto_envelope();
    let sealed = seal(&envelope, "k1", "tamper me").await;

    for index in 0..sealed.cipher_text.len() {
        let mut tampered = sealed.clone();
        tampered.cipher_text[index] ^= 0x80;
        let err = open(&envelope, "k1", tampered).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError, "cipher text byte {index}");
    }

    for index in 0..sealed.initialization_vector.len() {
        let mut tampered = sealed.clone();
        tampered.initialization_vector[index] ^= 0x01;
        let err = open(&envelope, "k1", tampered).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError, "iv byte {index}");
    }

    assert_eq!(open(&envelope, "k1", sealed).await.unwrap(), "tamper me");
}

#[tokio::test]
async fn iv_from_another_envelope_fails() {
    let envelope = crypto_envelope();
    let first = seal(&envelope, "k1", "one").await;
    let second = seal(&envelope, "k1", "two").await;

    let mixed = CipherEnvelope::new(first.cipher_text, second.initialization_vector);
    assert!(matches!(
        open(&envelope, "k1", mixed).await,
        Err(EnvelopeError::DecryptionFailed)
    ));
}

#[tokio::test]
async fn key_from_another_name_fails() {
    let envelope = crypto_envelope();
    let sealed = seal(&envelope, "k1", "secret").await;
    seal(&envelope, "k2", "other").await;

    assert!(matches!(
        open(&envelope, "k2", sealed).await,
        Err(EnvelopeError::DecryptionFailed)
    ));
}

#[tokio::test]
async fn deleted_key_cannot_open_old_envelopes() {
    let envelope = crypto_envelope();
    let sealed = seal(&envelope, "k1", "secret").await;

    assert_eq!(envelope.delete_key("k1", &prompt()).await.unwrap(), Outcome::Completed(true));
    assert!(!envelope.key_exists("k1").await.unwrap());
    assert_eq!(envelope.delete_key("k1", &prompt()).await.unwrap(), Outcome::Completed(false));

    assert!(matches!(
        open(&envelope, "k1", sealed).await,
        Err(EnvelopeError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn xchacha_vault_round_trip() {
    let envelope = CryptoEnvelope::new(
        Arc::new(MemoryKeyVault::with_cipher(XChaCha20Poly1305Cipher)),
        Arc::new(ApprovingGate),
    );
    let sealed = seal(&envelope, "k1", "extended nonce").await;
    assert_eq!(sealed.initialization_vector.len(), 24);
    assert_eq!(open(&envelope, "k1", sealed).await.unwrap(), "extended nonce");
}

#[tokio::test]
async fn stored_envelope_opens_later() {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    biometry_vault::run_migrations(&pool).await.unwrap();
    let store = EnvelopeStore::new(pool);

    let envelope = crypto_envelope();
    let sealed = seal(&envelope, "k1", "remember me").await;
    store.put("ciphertext_wrapper", &sealed).await.unwrap();

    let loaded = store.get("ciphertext_wrapper").await.unwrap().unwrap();
    assert_eq!(loaded, sealed);
    assert_eq!(
        envelope::decode(&envelope::encode(&loaded)).unwrap(),
        sealed
    );
    assert_eq!(open(&envelope, "k1", loaded).await.unwrap(), "remember me");
}
