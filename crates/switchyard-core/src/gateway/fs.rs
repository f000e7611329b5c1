use std::path::PathBuf;

use super::{Gateway, GatewayError, InvocationRequest, InvocationResponse, validate_service_name};

/// Serves canned envelopes from `<root>/<service_name>.json`.
///
/// Meant for local development against recorded backend responses; the
/// request payload is only logged.
#[derive(Debug)]
pub struct FixtureGateway {
    root: PathBuf,
}

impl FixtureGateway {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn fixture_path(&self, service_name: &str) -> Result<PathBuf, GatewayError> {
        validate_service_name(service_name)?;
        Ok(self.root.join(format!("{service_name}.json")))
    }
}

impl Gateway for FixtureGateway {
    fn scheme(&self) -> &'static str {
        "fs"
    }

    fn invoke(
        &self,
        service_name: &str,
        request: &InvocationRequest,
    ) -> Result<InvocationResponse, GatewayError> {
        let path = self.fixture_path(service_name)?;
        tracing::debug!(
            service = service_name,
            path = %path.display(),
            fields = request.len(),
            "serving fixture"
        );
        if !path.is_file() {
            return Err(GatewayError::MissingFixture {
                service: service_name.to_string(),
                path,
            });
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| GatewayError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| GatewayError::Decode {
            service: service_name.to_string(),
            source,
        })
    }
}
