//! JSON-in, JSON-out dispatch for hosts that cannot call typed Rust.

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    BiometryBridge,
    types::{BridgeError, OpenRequest, SealRequest, SensorRequest, SimplePromptRequest},
};

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a BridgeError,
}

pub(crate) async fn dispatch(bridge: &BiometryBridge, method: &str, payload: &str) -> String {
    match method {
        "isSensorAvailable" => match parse::<SensorRequest>(payload) {
            Ok(request) => encode_json(&bridge.is_sensor_available(request.allow_device_credentials)),
            Err(error) => encode_error(&error),
        },
        "simplePrompt" => match parse::<SimplePromptRequest>(payload) {
            Ok(request) => respond(bridge.simple_prompt(request).await),
            Err(error) => encode_error(&error),
        },
        "seal" => match parse::<SealRequest>(payload) {
            Ok(request) => respond(bridge.seal(request).await),
            Err(error) => encode_error(&error),
        },
        "open" => match parse::<OpenRequest>(payload) {
            Ok(request) => respond(bridge.open(request).await),
            Err(error) => encode_error(&error),
        },
        "biometricKeysExist" => respond(bridge.biometric_keys_exist().await),
        "deleteKeys" => respond(bridge.delete_keys().await),
        other => encode_error(&BridgeError::new(
            BridgeError::UNKNOWN_METHOD,
            format!("unknown method: {other}"),
        )),
    }
}

/// Blank payloads count as `{}` so argument-less calls can pass nothing.
fn parse<T: DeserializeOwned>(payload: &str) -> Result<T, BridgeError> {
    let payload = payload.trim();
    let payload = if payload.is_empty() {
        "{}"
    } else {
        payload
    };
    serde_json::from_str(payload)
        .map_err(|e| BridgeError::new(BridgeError::INVALID_REQUEST, e.to_string()))
}

fn respond<T: Serialize>(result: Result<T, BridgeError>) -> String {
    match result {
        Ok(value) => encode_json(&value),
        Err(error) => encode_error(&error),
    }
}

fn encode_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => json,
        Err(_) => {
            "{\"error\":{\"code\":\"SERIALIZATION_ERROR\",\"message\":\"failed to serialize response\"}}"
                .to_owned()
        },
    }
}

fn encode_error(error: &BridgeError) -> String {
    encode_json(&ErrorEnvelope { error })
}
