//! Application-facing surface for biometric prompts and sealed envelopes.
//!
//! [`BiometryBridge`] exposes the six operations an app calls (sensor check,
//! simple prompt, seal, open, key existence, key deletion) with camelCase
//! serde results, and [`BiometryBridge::handle_json`] dispatches the same
//! operations from JSON strings for hosts that only speak JSON.

use std::{sync::Arc, time::Duration};

use {
    biometry_config::{BiometryConfig, CipherAlgorithm},
    biometry_vault::{
        BiometricGate, CryptoEnvelope, EnvelopeOptions, KeyVault, MemoryKeyVault, Outcome,
        XChaCha20Poly1305Cipher,
    },
};

mod json;
#[cfg(feature = "tracing")]
pub mod telemetry;
pub mod types;

#[cfg(feature = "tracing")]
pub use telemetry::init_telemetry;
pub use types::{
    BridgeError, KeysDeletedResult, KeysExistResult, OpenRequest, OpenResult, PromptRequest,
    SealRequest, SealResult, SensorAvailableResult, SensorRequest, SimplePromptRequest,
    SimplePromptResult, USER_CANCELLATION,
};

/// Bridge between an application and a [`CryptoEnvelope`].
pub struct BiometryBridge {
    config: BiometryConfig,
    envelope: CryptoEnvelope,
}

impl BiometryBridge {
    /// Build a bridge over explicit collaborators.
    #[must_use]
    pub fn new(
        config: BiometryConfig,
        vault: Arc<dyn KeyVault>,
        gate: Arc<dyn BiometricGate>,
    ) -> Self {
        let options = EnvelopeOptions {
            require_auth_for_delete: config.security.require_auth_for_delete,
            authorization_timeout: config.prompt.timeout_secs.map(Duration::from_secs),
        };
        let envelope = CryptoEnvelope::with_options(vault, gate, options);
        Self { config, envelope }
    }

    /// Build a bridge with an in-process key vault using the configured cipher.
    #[must_use]
    pub fn from_config(config: BiometryConfig, gate: Arc<dyn BiometricGate>) -> Self {
        let vault: Arc<dyn KeyVault> = match config.cipher.algorithm {
            CipherAlgorithm::Aes256Gcm => Arc::new(MemoryKeyVault::new()),
            CipherAlgorithm::XChaCha20Poly1305 => {
                Arc::new(MemoryKeyVault::with_cipher(XChaCha20Poly1305Cipher))
            },
        };
        Self::new(config, vault, gate)
    }

    #[must_use]
    pub fn config(&self) -> &BiometryConfig {
        &self.config
    }

    #[must_use]
    pub fn envelope(&self) -> &CryptoEnvelope {
        &self.envelope
    }

    fn key_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.config.keys.default_alias)
    }

    #[must_use]
    pub fn is_sensor_available(&self, allow_device_credentials: bool) -> SensorAvailableResult {
        let _call = BridgeCall::start("is_sensor_available");
        self.envelope.availability(allow_device_credentials).into()
    }

    pub async fn simple_prompt(
        &self,
        request: SimplePromptRequest,
    ) -> Result<SimplePromptResult, BridgeError> {
        let call = BridgeCall::start("simple_prompt");
        let prompt = request.resolve(&self.config.prompt);
        let outcome = call.check(self.envelope.simple_prompt(&prompt).await)?;
        Ok(match outcome {
            Outcome::Completed(()) => SimplePromptResult {
                success: true,
                error: None,
            },
            Outcome::Cancelled => SimplePromptResult {
                success: false,
                error: Some(USER_CANCELLATION.into()),
            },
        })
    }

    pub async fn seal(&self, request: SealRequest) -> Result<SealResult, BridgeError> {
        let call = BridgeCall::start("seal");
        let key_name = self.key_name(request.key_name.as_deref());
        let prompt = request.prompt.resolve(&self.config.prompt);
        let outcome = call.check(
            self.envelope
                .seal_to_string(key_name, &prompt, &request.plaintext)
                .await,
        )?;
        Ok(match outcome {
            Outcome::Completed(wire) => SealResult {
                success: true,
                encrypted_envelope: Some(wire),
                error: None,
            },
            Outcome::Cancelled => SealResult {
                success: false,
                encrypted_envelope: None,
                error: Some(USER_CANCELLATION.into()),
            },
        })
    }

    pub async fn open(&self, request: OpenRequest) -> Result<OpenResult, BridgeError> {
        let call = BridgeCall::start("open");
        let key_name = self.key_name(request.key_name.as_deref());
        let prompt = request.prompt.resolve(&self.config.prompt);
        let outcome = call.check(
            self.envelope
                .open_from_string(key_name, &prompt, &request.encrypted_envelope)
                .await,
        )?;
        Ok(match outcome {
            Outcome::Completed(plaintext) => OpenResult {
                success: true,
                plaintext: Some(plaintext),
                error: None,
            },
            Outcome::Cancelled => OpenResult {
                success: false,
                plaintext: None,
                error: Some(USER_CANCELLATION.into()),
            },
        })
    }

    /// Whether the default-alias key exists.
    pub async fn biometric_keys_exist(&self) -> Result<KeysExistResult, BridgeError> {
        let call = BridgeCall::start("biometric_keys_exist");
        let keys_exist = call.check(
            self.envelope
                .key_exists(&self.config.keys.default_alias)
                .await,
        )?;
        Ok(KeysExistResult { keys_exist })
    }

    /// Delete the default-alias key. A cancelled re-authentication deletes
    /// nothing.
    pub async fn delete_keys(&self) -> Result<KeysDeletedResult, BridgeError> {
        let call = BridgeCall::start("delete_keys");
        let prompt = PromptRequest::default().resolve(&self.config.prompt);
        let outcome = call.check(
            self.envelope
                .delete_key(&self.config.keys.default_alias, &prompt)
                .await,
        )?;
        Ok(KeysDeletedResult {
            keys_deleted: outcome.completed().unwrap_or(false),
        })
    }

    /// Dispatch `method` with a JSON `payload` and return a JSON string.
    ///
    /// Method names are the camelCase operation names (`isSensorAvailable`,
    /// `simplePrompt`, `seal`, `open`, `biometricKeysExist`, `deleteKeys`).
    /// Failures come back as `{"error":{"code":...,"message":...}}`.
    pub async fn handle_json(&self, method: &str, payload: &str) -> String {
        json::dispatch(self, method, payload).await
    }
}

// ── Metrics / tracing helpers ──────────────────────────────────────────────

/// One bridge call, counted on start and on failure.
struct BridgeCall {
    function: &'static str,
}

impl BridgeCall {
    fn start(function: &'static str) -> Self {
        record_call(function);
        trace_call(function);
        Self { function }
    }

    fn check<T>(&self, result: Result<T, biometry_vault::EnvelopeError>) -> Result<T, BridgeError> {
        result.map_err(|error| {
            let error = BridgeError::from(error);
            record_error(self.function, &error.code);
            error
        })
    }
}

#[cfg(feature = "metrics")]
fn record_call(function: &'static str) {
    metrics::counter!("biometry_bridge_calls_total", "function" => function).increment(1);
}

#[cfg(not(feature = "metrics"))]
fn record_call(_function: &'static str) {}

#[cfg(feature = "metrics")]
fn record_error(function: &'static str, code: &str) {
    metrics::counter!(
        "biometry_bridge_errors_total",
        "function" => function,
        "code" => code.to_owned()
    )
    .increment(1);
}

#[cfg(not(feature = "metrics"))]
fn record_error(_function: &'static str, _code: &str) {}

#[cfg(feature = "tracing")]
fn trace_call(function: &'static str) {
    tracing::debug!(target: "biometry_bridge", function, "bridge call");
}

#[cfg(not(feature = "tracing"))]
fn trace_call(_function: &'static str) {}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        biometry_vault::{
            AuthorizationRequest, AuthorizationTicket, Availability, BiometryType, GateError,
            PromptOptions, UnavailableReason,
        },
        std::sync::Mutex,
    };

    /// Gate that replays a fixed answer and remembers the last prompt it saw.
    struct FixedGate {
        approve: bool,
        last_prompt: Mutex<Option<PromptOptions>>,
    }

    impl FixedGate {
        fn new(approve: bool) -> Arc<Self> {
            Arc::new(Self {
                approve,
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait::async_trait]
    impl BiometricGate for FixedGate {
        fn availability(&self, allow_device_credentials: bool) -> Availability {
            if allow_device_credentials {
                Availability::available(BiometryType::Biometrics)
            } else {
                Availability::unavailable(UnavailableReason::NoneEnrolled)
            }
        }

        async fn prompt(&self, options: &PromptOptions) -> Result<Outcome<()>, GateError> {
            *self.last_prompt.lock().unwrap() = Some(options.clone());
            Ok(if self.approve {
                Outcome::Completed(())
            } else {
                Outcome::Cancelled
            })
        }

        async fn authorize(
            &self,
            request: AuthorizationRequest,
        ) -> Result<Outcome<AuthorizationTicket>, GateError> {
            *self.last_prompt.lock().unwrap() = Some(request.prompt().clone());
            Ok(if self.approve {
                Outcome::Completed(AuthorizationTicket::grant(request))
            } else {
                Outcome::Cancelled
            })
        }
    }

    fn seal_request(key_name: Option<&str>, plaintext: &str) -> SealRequest {
        SealRequest {
            key_name: key_name.map(str::to_owned),
            prompt: PromptRequest::default(),
            plaintext: plaintext.into(),
        }
    }

    #[test]
    fn sensor_check_maps_availability() {
        let bridge = BiometryBridge::from_config(BiometryConfig::default(), FixedGate::new(true));
        let result = bridge.is_sensor_available(false);
        assert!(!result.available);
        assert_eq!(result.error.as_deref(), Some("BIOMETRIC_ERROR_NONE_ENROLLED"));

        let result = bridge.is_sensor_available(true);
        assert!(result.available);
        assert_eq!(result.biometry_type, Some(BiometryType::Biometrics));
    }

    #[tokio::test]
    async fn seal_defaults_to_configured_alias() {
        let bridge = BiometryBridge::from_config(BiometryConfig::default(), FixedGate::new(true));
        assert!(!bridge.biometric_keys_exist().await.unwrap().keys_exist);

        let sealed = bridge.seal(seal_request(None, "hello")).await.unwrap();
        assert!(sealed.success);
        assert!(bridge.biometric_keys_exist().await.unwrap().keys_exist);

        let opened = bridge
            .open(OpenRequest {
                key_name: Some("biometric_key".into()),
                prompt: PromptRequest::default(),
                encrypted_envelope: sealed.encrypted_envelope.unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(opened.plaintext.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn cancellation_is_not_an_error() {
        let bridge = BiometryBridge::from_config(BiometryConfig::default(), FixedGate::new(false));

        let prompt = bridge
            .simple_prompt(SimplePromptRequest::default())
            .await
            .unwrap();
        assert_eq!(prompt, SimplePromptResult {
            success: false,
            error: Some(USER_CANCELLATION.into()),
        });

        let sealed = bridge.seal(seal_request(Some("k1"), "x")).await.unwrap();
        assert!(!sealed.success);
        assert!(sealed.encrypted_envelope.is_none());
        assert_eq!(sealed.error.as_deref(), Some(USER_CANCELLATION));
    }

    #[tokio::test]
    async fn open_failures_carry_kind_codes() {
        let bridge = BiometryBridge::from_config(BiometryConfig::default(), FixedGate::new(true));

        let missing = bridge
            .open(OpenRequest {
                key_name: Some("k1".into()),
                prompt: PromptRequest::default(),
                encrypted_envelope: "AAAA:BBBB".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(missing.code, "KEY_NOT_FOUND");

        let malformed = bridge
            .open(OpenRequest {
                key_name: Some("k1".into()),
                prompt: PromptRequest::default(),
                encrypted_envelope: "no separator".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(malformed.code, "MALFORMED_ENVELOPE");
    }

    #[tokio::test]
    async fn prompt_defaults_come_from_config() {
        let mut config = BiometryConfig::default();
        config.prompt.prompt_message = "Unlock vault".into();
        config.prompt.cancel_button_text = "Not now".into();
        let gate = FixedGate::new(true);
        let bridge = BiometryBridge::from_config(config, gate.clone());

        bridge.seal(seal_request(None, "x")).await.unwrap();
        let seen = gate.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(seen.prompt_message, "Unlock vault");
        assert_eq!(seen.cancel_button_text, "Not now");
    }

    #[tokio::test]
    async fn delete_keys_respects_reauth_setting() {
        let mut config = BiometryConfig::default();
        config.security.require_auth_for_delete = true;
        let bridge = BiometryBridge::from_config(config, FixedGate::new(true));

        assert!(!bridge.delete_keys().await.unwrap().keys_deleted);
        bridge.seal(seal_request(None, "x")).await.unwrap();
        assert!(bridge.delete_keys().await.unwrap().keys_deleted);
        assert!(!bridge.biometric_keys_exist().await.unwrap().keys_exist);
    }

    #[tokio::test]
    async fn cancelled_reauth_keeps_key() {
        let mut config = BiometryConfig::default();
        config.security.require_auth_for_delete = true;
        let vault: Arc<dyn KeyVault> = Arc::new(MemoryKeyVault::new());
        vault.get_or_create("biometric_key").await.unwrap();

        let bridge = BiometryBridge::new(config, vault, FixedGate::new(false));
        assert!(!bridge.delete_keys().await.unwrap().keys_deleted);
        assert!(bridge.biometric_keys_exist().await.unwrap().keys_exist);
    }

    #[tokio::test]
    async fn xchacha_config_selects_extended_nonce() {
        let mut config = BiometryConfig::default();
        config.cipher.algorithm = CipherAlgorithm::XChaCha20Poly1305;
        let bridge = BiometryBridge::from_config(config, FixedGate::new(true));

        let wire = bridge
            .seal(seal_request(None, "x"))
            .await
            .unwrap()
            .encrypted_envelope
            .unwrap();
        let (iv, _) = wire.split_once(':').unwrap();
        assert_eq!(iv.len(), 32); // 24 bytes of nonce
    }
}
