use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use url::Url;

pub const GATEWAY_URL_ENV: &str = "SWITCHYARD_GATEWAY_URL";
pub const GATEWAY_TIMEOUT_ENV: &str = "SWITCHYARD_GATEWAY_TIMEOUT";
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the remote invocation backend.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub location: GatewayLocation,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(location: GatewayLocation) -> Self {
        Self {
            location,
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Build from the raw strings found in a config file; `timeout` uses
    /// humantime syntax (`"30s"`, `"1m 30s"`).
    pub fn from_parts(location: &str, timeout: Option<&str>) -> Result<Self> {
        let location = GatewayLocation::from_value(location)?;
        let timeout = match timeout {
            Some(raw) => parse_timeout(raw)?,
            None => DEFAULT_GATEWAY_TIMEOUT,
        };
        Ok(Self { location, timeout })
    }

    /// Apply `SWITCHYARD_GATEWAY_URL` / `SWITCHYARD_GATEWAY_TIMEOUT` on top of
    /// the file-provided values.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(raw) = env_value(GATEWAY_URL_ENV) {
            self.location = GatewayLocation::from_value(&raw)
                .with_context(|| format!("{GATEWAY_URL_ENV} is not a valid gateway location"))?;
        }
        if let Some(raw) = env_value(GATEWAY_TIMEOUT_ENV) {
            self.timeout = parse_timeout(&raw)
                .with_context(|| format!("{GATEWAY_TIMEOUT_ENV} is not a valid duration"))?;
        }
        Ok(self)
    }
}

/// Location of the backend: an HTTP(S) endpoint or a fixture directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayLocation {
    Remote(Url),
    Dir(PathBuf),
}

impl GatewayLocation {
    pub fn from_value(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(anyhow!("gateway location must not be empty"));
        }
        if value.starts_with("http://") || value.starts_with("https://") {
            let url = Url::parse(value).context("gateway location is not a valid URL")?;
            return Ok(Self::Remote(url));
        }
        if let Some(stripped) = value.strip_prefix("fs://") {
            return Ok(Self::Dir(PathBuf::from(stripped)));
        }
        if value.starts_with("file://") {
            let url = Url::parse(value).context("gateway location is not a valid file:// URL")?;
            let path = url
                .to_file_path()
                .map_err(|_| anyhow!("gateway location points to an invalid file URI"))?;
            return Ok(Self::Dir(path));
        }
        Ok(Self::Dir(PathBuf::from(value)))
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Remote(_) => "http",
            Self::Dir(_) => "fs",
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Remote(url) => url.to_string(),
            Self::Dir(path) => path.display().to_string(),
        }
    }
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    humantime::parse_duration(raw.trim()).with_context(|| format!("invalid timeout `{raw}`"))
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn location_parses_urls_and_paths() {
        assert!(matches!(
            GatewayLocation::from_value("https://admin.example.com/zato/").unwrap(),
            GatewayLocation::Remote(_)
        ));
        assert_eq!(
            GatewayLocation::from_value("fs://fixtures/services").unwrap(),
            GatewayLocation::Dir(PathBuf::from("fixtures/services"))
        );
        assert_eq!(
            GatewayLocation::from_value("./fixtures").unwrap(),
            GatewayLocation::Dir(PathBuf::from("./fixtures"))
        );
        assert!(GatewayLocation::from_value("  ").is_err());
    }

    #[test]
    fn from_parts_reads_humantime_timeout() {
        let cfg = GatewayConfig::from_parts("http://localhost:17010/", Some("1m 5s")).unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(65));
        assert_eq!(cfg.location.scheme(), "http");

        let cfg = GatewayConfig::from_parts("fixtures", None).unwrap();
        assert_eq!(cfg.timeout, DEFAULT_GATEWAY_TIMEOUT);
        assert!(GatewayConfig::from_parts("fixtures", Some("soon")).is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_replace_file_values() {
        unsafe {
            std::env::set_var(GATEWAY_URL_ENV, "http://gateway.internal:8080/");
            std::env::set_var(GATEWAY_TIMEOUT_ENV, "5s");
        }
        let cfg = GatewayConfig::new(GatewayLocation::Dir(PathBuf::from("fixtures")))
            .with_env_overrides();
        unsafe {
            std::env::remove_var(GATEWAY_URL_ENV);
            std::env::remove_var(GATEWAY_TIMEOUT_ENV);
        }
        let cfg = cfg.unwrap();
        assert_eq!(cfg.location.display(), "http://gateway.internal:8080/");
        assert_eq!(cfg.timeout, Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn env_overrides_reject_bad_timeout() {
        unsafe {
            std::env::set_var(GATEWAY_TIMEOUT_ENV, "later");
        }
        let result = GatewayConfig::new(GatewayLocation::Dir(PathBuf::from("fixtures")))
            .with_env_overrides();
        unsafe {
            std::env::remove_var(GATEWAY_TIMEOUT_ENV);
        }
        assert!(result.is_err());
    }
}
