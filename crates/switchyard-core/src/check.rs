//! Internal service-to-service check protocol.
//!
//! A check request carries its payload through two explicit stages on the
//! way out and the reverse two on the way back:
//!
//! | stage         | input                | output                        |
//! |---------------|----------------------|-------------------------------|
//! | `serialize`   | JSON value           | `application/json` bytes      |
//! | `encode`      | JSON bytes           | base64 text (RFC 4648)        |
//! | `decode`      | base64 text          | `application/json` bytes      |
//! | `deserialize` | JSON bytes           | JSON value                    |
//!
//! The envelope returned by the check endpoint is plain JSON; only the
//! nested `response` field goes through `decode` + `deserialize`.

use std::time::Duration;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

pub const ZATO_OK: &str = "ZATO_OK";
pub const CHANNEL_INTERNAL_CHECK: &str = "internal-check";
pub const DATA_FORMAT_JSON: &str = "json";
pub const TRANSPORT_PLAIN_HTTP: &str = "plain_http";
pub const CID_HEADER: &str = "X-Zato-CID";

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to serialize check payload")]
    Serialize(#[source] serde_json::Error),
    #[error("check payload is not valid base64")]
    Decode(#[source] base64::DecodeError),
    #[error("check payload is not valid JSON")]
    Deserialize(#[source] serde_json::Error),
    #[error("check envelope is missing `{0}`")]
    MissingField(&'static str),
    #[error("check request failed")]
    Transport(#[source] reqwest::Error),
    #[error("check endpoint answered with HTTP {0}")]
    Status(u16),
}

/// Stage 1: JSON value to `application/json` bytes.
pub fn serialize(payload: &Value) -> Result<Vec<u8>, CheckError> {
    serde_json::to_vec(payload).map_err(CheckError::Serialize)
}

/// Stage 2: bytes to base64 text.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Reverse of [`encode`]. Line breaks (MIME-style wrapping) are tolerated.
pub fn decode(text: &str) -> Result<Vec<u8>, CheckError> {
    let compact: String = text.chars().filter(|ch| !ch.is_whitespace()).collect();
    STANDARD.decode(compact).map_err(CheckError::Decode)
}

/// Reverse of [`serialize`].
pub fn deserialize(bytes: &[u8]) -> Result<Value, CheckError> {
    serde_json::from_slice(bytes).map_err(CheckError::Deserialize)
}

/// Wire form of a check invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRequest {
    pub name: String,
    pub payload: String,
    pub channel: &'static str,
    pub data_format: &'static str,
    pub transport: &'static str,
}

impl CheckRequest {
    /// An absent payload is sent as JSON `null`.
    pub fn new(service: &str, payload: Option<&Value>) -> Result<Self, CheckError> {
        let bytes = serialize(payload.unwrap_or(&Value::Null))?;
        Ok(Self {
            name: service.to_string(),
            payload: encode(&bytes),
            channel: CHANNEL_INTERNAL_CHECK,
            data_format: DATA_FORMAT_JSON,
            transport: TRANSPORT_PLAIN_HTTP,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// The checked service succeeded; holds its `response` object.
    Ok(Map<String, Value>),
    /// Anything other than `ZATO_OK`: the envelope exactly as received.
    Raw(Value),
}

pub fn interpret_envelope(envelope: Value) -> Result<CheckOutcome, CheckError> {
    let result = envelope.pointer("/zato_env/result").and_then(Value::as_str);
    if result != Some(ZATO_OK) {
        return Ok(CheckOutcome::Raw(envelope));
    }
    let encoded = envelope
        .pointer("/zato_service_invoke_response/response")
        .and_then(Value::as_str)
        .ok_or(CheckError::MissingField("zato_service_invoke_response.response"))?;
    let decoded = deserialize(&decode(encoded)?)?;
    match decoded {
        Value::Object(mut map) => match map.remove("response") {
            Some(Value::Object(inner)) => Ok(CheckOutcome::Ok(inner)),
            Some(Value::Null) | None => Ok(CheckOutcome::Ok(Map::new())),
            Some(_) => Err(CheckError::MissingField("response")),
        },
        _ => Err(CheckError::MissingField("response")),
    }
}

/// Blocking client for the check endpoint.
#[derive(Debug)]
pub struct CheckClient {
    endpoint: Url,
    http: Client,
}

impl CheckClient {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build check HTTP client")?;
        Ok(Self { endpoint, http })
    }

    pub fn invoke_check(
        &self,
        cid: &str,
        service: &str,
        payload: Option<&Value>,
    ) -> Result<CheckOutcome, CheckError> {
        let request = CheckRequest::new(service, payload)?;
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CID_HEADER, cid)
            .json(&request)
            .send()
            .map_err(CheckError::Transport)?;
        if !response.status().is_success() {
            return Err(CheckError::Status(response.status().as_u16()));
        }
        let body = response.bytes().map_err(CheckError::Transport)?;
        let envelope = deserialize(&body)?;
        tracing::info!(cid, service, envelope = %envelope, "check invoke response");
        let outcome = interpret_envelope(envelope)?;
        if let CheckOutcome::Ok(response) = &outcome {
            tracing::info!(cid, service, fields = response.len(), "check response decoded");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok_envelope(response: &Value) -> Value {
        let encoded = encode(&serialize(response).unwrap());
        json!({
            "zato_env": {"result": ZATO_OK},
            "zato_service_invoke_response": {"response": encoded}
        })
    }

    #[test]
    fn request_encodes_payload_as_base64_json() {
        let request = CheckRequest::new("zato.ping", Some(&json!({"a": 1}))).unwrap();
        assert_eq!(request.channel, CHANNEL_INTERNAL_CHECK);
        assert_eq!(request.data_format, DATA_FORMAT_JSON);
        let decoded = deserialize(&decode(&request.payload).unwrap()).unwrap();
        assert_eq!(decoded, json!({"a": 1}));
    }

    #[test]
    fn absent_payload_is_json_null() {
        let request = CheckRequest::new("zato.ping", None).unwrap();
        assert_eq!(decode(&request.payload).unwrap(), b"null");
    }

    #[test]
    fn decode_tolerates_wrapped_lines() {
        let text = encode(&[7u8; 120]);
        let wrapped = format!("{}\n{}\n", &text[..76], &text[76..]);
        assert_eq!(decode(&wrapped).unwrap(), vec![7u8; 120]);
    }

    #[test]
    fn ok_envelope_yields_inner_response() {
        let envelope = ok_envelope(&json!({"response": {"pong": "ok"}}));
        let outcome = interpret_envelope(envelope).unwrap();
        let mut expected = Map::new();
        expected.insert("pong".into(), json!("ok"));
        assert_eq!(outcome, CheckOutcome::Ok(expected));
    }

    #[test]
    fn non_ok_envelope_is_returned_unchanged() {
        let envelope = json!({"zato_env": {"result": "ZATO_ERROR", "details": "boom"}});
        let outcome = interpret_envelope(envelope.clone()).unwrap();
        assert_eq!(outcome, CheckOutcome::Raw(envelope));
    }

    #[test]
    fn ok_envelope_without_response_field_is_an_error() {
        let envelope = json!({"zato_env": {"result": ZATO_OK}});
        assert!(matches!(
            interpret_envelope(envelope),
            Err(CheckError::MissingField(_))
        ));
    }
}
