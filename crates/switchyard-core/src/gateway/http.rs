use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use url::Url;

use super::{Gateway, GatewayError, InvocationRequest, InvocationResponse, validate_service_name};

/// Posts the invocation payload as JSON to `<base>/<service_name>` and
/// expects an `{"ok": .., "data": ..}` envelope back.
#[derive(Debug)]
pub struct HttpGateway {
    base: Url,
    client: Client,
}

impl HttpGateway {
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build gateway HTTP client")?;
        Ok(Self {
            base: with_trailing_slash(base),
            client,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn service_url(&self, service_name: &str) -> Result<Url, GatewayError> {
        validate_service_name(service_name)?;
        self.base
            .join(service_name)
            .map_err(|_| GatewayError::InvalidServiceName(service_name.to_string()))
    }
}

impl Gateway for HttpGateway {
    fn scheme(&self) -> &'static str {
        "http"
    }

    fn invoke(
        &self,
        service_name: &str,
        request: &InvocationRequest,
    ) -> Result<InvocationResponse, GatewayError> {
        let url = self.service_url(service_name)?;
        tracing::debug!(service = service_name, %url, "invoking remote service");
        let transport = |source| GatewayError::Transport {
            service: service_name.to_string(),
            source,
        };
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                service: service_name.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().map_err(transport)?;
        serde_json::from_str(&body).map_err(|source| GatewayError::Decode {
            service: service_name.to_string(),
            source,
        })
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
