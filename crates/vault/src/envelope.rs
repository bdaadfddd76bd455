//! Cipher envelopes and their transport encodings.
//!
//! The canonical wire shape is a single string `"<ivBase64>:<cipherTextBase64>"`
//! using the standard base64 alphabet with padding. Because that alphabet has
//! no `:`, splitting on the first colon is unambiguous.
//!
//! Some integrations carry the two halves as separate base64 fields instead
//! (for example a JSON object persisted in app preferences). [`EnvelopeFields`]
//! and [`encode_field`] / [`decode_field`] cover that shape explicitly.

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    serde::{Deserialize, Serialize},
};

use crate::error::EnvelopeError;

/// Separator between the IV and cipher text in the joined wire format.
pub const SEPARATOR: char = ':';

/// Output of one encryption: the cipher text and the IV produced with it.
///
/// Two envelopes are equal only when both fields match byte for byte.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CipherEnvelope {
    pub cipher_text: Vec<u8>,
    pub initialization_vector: Vec<u8>,
}

impl CipherEnvelope {
    #[must_use]
    pub fn new(cipher_text: Vec<u8>, initialization_vector: Vec<u8>) -> Self {
        Self {
            cipher_text,
            initialization_vector,
        }
    }

    /// Split into independently base64-encoded fields.
    #[must_use]
    pub fn to_fields(&self) -> EnvelopeFields {
        EnvelopeFields {
            cipher_text: encode_field(&self.cipher_text),
            initialization_vector: encode_field(&self.initialization_vector),
        }
    }

    /// Rebuild from independently base64-encoded fields.
    pub fn from_fields(fields: &EnvelopeFields) -> Result<Self, EnvelopeError> {
        let cipher_text = decode_field(&fields.cipher_text)?;
        let initialization_vector = decode_field(&fields.initialization_vector)?;
        if cipher_text.is_empty() || initialization_vector.is_empty() {
            return Err(EnvelopeError::MalformedEnvelope("empty field".into()));
        }
        Ok(Self::new(cipher_text, initialization_vector))
    }
}

impl std::fmt::Debug for CipherEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherEnvelope")
            .field("cipher_text_len", &self.cipher_text.len())
            .field("iv_len", &self.initialization_vector.len())
            .finish()
    }
}

/// Two-field transport shape, serialized as
/// `{"cipherText": "...", "initializationVector": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeFields {
    pub cipher_text: String,
    pub initialization_vector: String,
}

/// Encode an envelope as `"<ivBase64>:<cipherTextBase64>"`.
#[must_use]
pub fn encode(envelope: &CipherEnvelope) -> String {
    let iv = encode_field(&envelope.initialization_vector);
    let cipher_text = encode_field(&envelope.cipher_text);
    format!("{iv}{SEPARATOR}{cipher_text}")
}

/// Parse the joined wire format.
///
/// Fails with [`EnvelopeError::MalformedEnvelope`] unless the input holds
/// exactly two non-empty, valid base64 parts.
pub fn decode(wire: &str) -> Result<CipherEnvelope, EnvelopeError> {
    let (iv, cipher_text) = wire
        .split_once(SEPARATOR)
        .ok_or_else(|| malformed("missing ':' separator"))?;

    if iv.is_empty() || cipher_text.is_empty() {
        return Err(malformed("empty field"));
    }
    if cipher_text.contains(SEPARATOR) {
        return Err(malformed("more than one ':' separator"));
    }

    let cipher_text = decode_strict(cipher_text)?;
    let iv = decode_strict(iv)?;
    if cipher_text.is_empty() || iv.is_empty() {
        return Err(malformed("empty field"));
    }
    Ok(CipherEnvelope::new(cipher_text, iv))
}

/// Base64-encode a single field (standard alphabet, padded).
#[must_use]
pub fn encode_field(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a single base64 field.
///
/// ASCII whitespace anywhere in the field is ignored, so values wrapped every
/// 76 characters by MIME-style encoders decode as-is. The joined wire format
/// gets no such leniency.
pub fn decode_field(field: &str) -> Result<Vec<u8>, EnvelopeError> {
    if !field.bytes().any(|b| b.is_ascii_whitespace()) {
        return decode_strict(field);
    }
    let compact: String = field.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    decode_strict(&compact)
}

fn decode_strict(field: &str) -> Result<Vec<u8>, EnvelopeError> {
    STANDARD
        .decode(field)
        .map_err(|e| malformed(&format!("invalid base64: {e}")))
}

fn malformed(reason: &str) -> EnvelopeError {
    EnvelopeError::MalformedEnvelope(reason.to_string())
}
