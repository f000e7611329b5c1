use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::env::{GatewayConfig, GatewayLocation};

pub mod fs;
pub mod http;

pub const ID_FIELD: &str = "id";
pub const CLUSTER_ID_FIELD: &str = "cluster_id";

/// Remote service invocation channel.
///
/// One call is one blocking round trip; the timeout belongs to the
/// implementation. Callers never retry, batch or cache.
pub trait Gateway: Send + Sync {
    fn scheme(&self) -> &'static str;

    fn invoke(
        &self,
        service_name: &str,
        request: &InvocationRequest,
    ) -> Result<InvocationResponse, GatewayError>;
}

/// Outgoing payload for a single invocation.
///
/// `id` and `cluster_id` are always present (possibly `null`) and always
/// come first; everything else keeps insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InvocationRequest {
    fields: IndexMap<String, Value>,
}

impl InvocationRequest {
    pub fn new(id: Option<&str>, cluster_id: Option<&str>) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(ID_FIELD.to_string(), optional_string(id));
        fields.insert(CLUSTER_ID_FIELD.to_string(), optional_string(cluster_id));
        Self { fields }
    }

    /// Insert or replace a field; replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn merge<I>(&mut self, extra: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (name, value) in extra {
            self.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub fn optional_string(value: Option<&str>) -> Value {
    value
        .map(|value| Value::String(value.to_string()))
        .unwrap_or(Value::Null)
}

/// Envelope returned by the backend. `data` is opaque to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    pub ok: bool,
    #[serde(default)]
    pub data: Value,
}

impl InvocationResponse {
    pub fn ok(data: Value) -> Self {
        Self { ok: true, data }
    }

    pub fn not_ok() -> Self {
        Self {
            ok: false,
            data: Value::Null,
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid service name `{0}`")]
    InvalidServiceName(String),
    #[error("request to service `{service}` failed")]
    Transport {
        service: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("service `{service}` answered with HTTP {status}")]
    Status { service: String, status: u16 },
    #[error("service `{service}` returned an undecodable envelope")]
    Decode {
        service: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no fixture for service `{service}` at {}", path.display())]
    MissingFixture { service: String, path: PathBuf },
    #[error("failed to read fixture {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn validate_service_name(service_name: &str) -> Result<(), GatewayError> {
    let trimmed = service_name.trim();
    if trimmed.is_empty()
        || trimmed != service_name
        || service_name.contains('/')
        || service_name.contains('\\')
        || service_name.starts_with('.')
    {
        return Err(GatewayError::InvalidServiceName(service_name.to_string()));
    }
    Ok(())
}

/// Build the gateway selected by `config.location`.
///
/// The HTTP gateway wraps a blocking client; build it outside of an async
/// context.
pub fn build_gateway(config: &GatewayConfig) -> Result<Arc<dyn Gateway>> {
    let gateway: Arc<dyn Gateway> = match &config.location {
        GatewayLocation::Remote(url) => {
            Arc::new(http::HttpGateway::new(url.clone(), config.timeout)?)
        }
        GatewayLocation::Dir(path) => Arc::new(fs::FixtureGateway::new(path.clone())),
    };
    tracing::info!(
        scheme = gateway.scheme(),
        location = %config.location.display(),
        "gateway configured"
    );
    Ok(gateway)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_always_carries_id_and_cluster() {
        let request = InvocationRequest::new(None, Some("1"));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"id": null, "cluster_id": "1"}));
    }

    #[test]
    fn merge_overrides_in_place_and_appends() {
        let mut request = InvocationRequest::new(Some("7"), None);
        request.merge([
            ("name".to_string(), json!("crm")),
            ("id".to_string(), json!("8")),
        ]);
        let keys: Vec<_> = request.fields().keys().cloned().collect();
        assert_eq!(keys, ["id", "cluster_id", "name"]);
        assert_eq!(request.get("id"), Some(&json!("8")));
        assert_eq!(request.len(), 3);
    }

    #[test]
    fn response_data_defaults_to_null() {
        let response: InvocationResponse = serde_json::from_value(json!({"ok": false})).unwrap();
        assert_eq!(response, InvocationResponse::not_ok());
    }

    #[test]
    fn service_names_must_be_plain_segments() {
        assert!(validate_service_name("zato.http-soap.get-list").is_ok());
        for bad in ["", " zato.ping", "a/b", "..", "a\\b"] {
            assert!(validate_service_name(bad).is_err(), "{bad} should be rejected");
        }
    }
}
