use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigError;
use crate::validation::validate_base_url;

/// Connection settings for the SSO server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base API address, e.g. `https://sso.example.com/api`.
    /// May be left out of the file and passed on the command line instead.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Path of the SSO configuration endpoint, relative to `base_url`.
    #[serde(default = "default_configuration_path")]
    pub configuration_path: String,

    /// Path of the identity provider selection endpoint, relative to `base_url`.
    #[serde(default = "default_resolution_path")]
    pub resolution_path: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Accept `localhost` and loopback addresses as `base_url`.
    #[serde(default)]
    pub allow_loopback: bool,

    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            configuration_path: default_configuration_path(),
            resolution_path: default_resolution_path(),
            request_timeout_secs: default_request_timeout_secs(),
            allow_loopback: false,
            user_agent: default_user_agent(),
        }
    }
}

fn default_configuration_path() -> String {
    "/auth/sso/config/".to_string()
}

fn default_resolution_path() -> String {
    "/auth/sso/select-idp/".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The validated base URL. Fails if none is configured.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .base_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Validation(
                    "client.base_url is required (set it in the config file or pass --base-url)"
                        .into(),
                )
            })?;
        validate_base_url(raw, self.allow_loopback)
            .map_err(|e| ConfigError::Validation(format!("client.base_url '{raw}': {e}")))
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_some() {
            self.base_url()?;
        }
        for (name, path) in [
            ("configuration_path", &self.configuration_path),
            ("resolution_path", &self.resolution_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "client.{name} must start with '/': {path}"
                )));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "client.request_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "client.user_agent must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.user_agent.starts_with("sso-selector/"));
    }

    #[test]
    fn test_missing_base_url() {
        let err = ClientConfig::default().base_url().unwrap_err();
        assert!(err.to_string().contains("--base-url"), "{err}");
    }

    #[test]
    fn test_loopback_base_url_needs_opt_in() {
        let mut config = ClientConfig {
            base_url: Some("http://localhost:8080/api".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.allow_loopback = true;
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "http://localhost:8080/api/"
        );
    }

    #[test]
    fn test_relative_path_rejected() {
        let config = ClientConfig {
            resolution_path: "auth/sso/select-idp/".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("resolution_path"), "{err}");
    }
}
