//! Persistence for sealed envelopes between `seal` and `open`.
//!
//! Each envelope is stored under a preference key as its two base64 fields,
//! the same shape integrations use when they keep envelopes in app
//! preferences. Only cipher text and IV are stored; keys never are.

use sqlx::SqlitePool;

use crate::{
    envelope::{CipherEnvelope, EnvelopeFields},
    error::EnvelopeError,
};

/// SQLite-backed envelope store. Requires the `envelope_store` table created
/// by [`run_migrations`](crate::run_migrations).
#[derive(Clone)]
pub struct EnvelopeStore {
    pool: SqlitePool,
}

impl EnvelopeStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store `envelope` under `pref_key`, replacing any previous envelope.
    pub async fn put(&self, pref_key: &str, envelope: &CipherEnvelope) -> Result<(), EnvelopeError> {
        let fields = envelope.to_fields();
        sqlx::query(
            "INSERT INTO envelope_store (pref_key, cipher_text, initialization_vector)
             VALUES (?, ?, ?)
             ON CONFLICT(pref_key) DO UPDATE SET
                cipher_text = excluded.cipher_text,
                initialization_vector = excluded.initialization_vector,
                updated_at = datetime('now')",
        )
        .bind(pref_key)
        .bind(&fields.cipher_text)
        .bind(&fields.initialization_vector)
        .execute(&self.pool)
        .await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(pref_key, "stored envelope");

        Ok(())
    }

    /// Load the envelope stored under `pref_key`, if any.
    pub async fn get(&self, pref_key: &str) -> Result<Option<CipherEnvelope>, EnvelopeError> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT cipher_text, initialization_vector FROM envelope_store WHERE pref_key = ?",
        )
        .bind(pref_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(cipher_text, initialization_vector)| {
            CipherEnvelope::from_fields(&EnvelopeFields {
                cipher_text,
                initialization_vector,
            })
        })
        .transpose()
    }

    /// Load the envelope under `pref_key` as a JSON object with
    /// `cipherText` / `initializationVector` fields.
    pub async fn get_json(&self, pref_key: &str) -> Result<Option<String>, EnvelopeError> {
        match self.get(pref_key).await? {
            Some(envelope) => Ok(Some(serde_json::to_string(&envelope.to_fields())?)),
            None => Ok(None),
        }
    }

    /// Remove the envelope under `pref_key`. Returns whether one existed.
    pub async fn remove(&self, pref_key: &str) -> Result<bool, EnvelopeError> {
        let result = sqlx::query("DELETE FROM envelope_store WHERE pref_key = ?")
            .bind(pref_key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> EnvelopeStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        EnvelopeStore::new(pool)
    }

    fn sample(fill: u8) -> CipherEnvelope {
        CipherEnvelope::new(vec![fill; 21], vec![fill; 12])
    }

    #[tokio::test]
    async fn put_and_get() {
        let store = test_store().await;
        assert!(store.get("ciphertext_wrapper").await.unwrap().is_none());

        store.put("ciphertext_wrapper", &sample(1)).await.unwrap();
        assert_eq!(store.get("ciphertext_wrapper").await.unwrap(), Some(sample(1)));
    }

    #[tokio::test]
    async fn put_replaces_existing() {
        let store = test_store().await;
        store.put("k", &sample(1)).await.unwrap();
        store.put("k", &sample(2)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(sample(2)));
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let store = test_store().await;
        assert!(!store.remove("k").await.unwrap());
        store.put("k", &sample(1)).await.unwrap();
        assert!(store.remove("k").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_shape_uses_field_names() {
        let store = test_store().await;
        store.put("k", &sample(0)).await.unwrap();

        let json = store.get_json("k").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["initializationVector"], "AAAAAAAAAAAAAAAA");
        assert!(value["cipherText"].is_string());
    }

    #[tokio::test]
    async fn corrupted_row_is_malformed() {
        let store = test_store().await;
        sqlx::query(
            "INSERT INTO envelope_store (pref_key, cipher_text, initialization_vector) VALUES ('k', 'not base64!', 'AAAA')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        assert!(matches!(
            store.get("k").await,
            Err(EnvelopeError::MalformedEnvelope(_))
        ));
    }
}
