use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::selection::EnginePolicy;

/// Selection session behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    /// Give up on one configuration fetch after this many seconds.
    #[serde(default = "default_timeout_secs")]
    pub configuration_timeout_secs: u64,

    /// Treat a resolution as failed after this many seconds.
    #[serde(default = "default_timeout_secs")]
    pub resolution_timeout_secs: u64,

    /// Extra configuration fetch attempts after the first failure.
    /// Once exhausted the session keeps showing the loading indicator.
    #[serde(default)]
    pub configuration_retries: u32,

    /// Delay between configuration fetch attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Request the resolution as soon as a `single` schema configuration
    /// arrives. When off, the presenter has to ask for it.
    #[serde(default = "default_true")]
    pub resolve_single_on_load: bool,

    /// Show an error (with a retry option) when resolution yields no
    /// identity provider, instead of the loading indicator.
    #[serde(default)]
    pub surface_resolution_errors: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            configuration_timeout_secs: default_timeout_secs(),
            resolution_timeout_secs: default_timeout_secs(),
            configuration_retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
            resolve_single_on_load: true,
            surface_resolution_errors: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl SelectionConfig {
    pub fn engine_policy(&self) -> EnginePolicy {
        EnginePolicy {
            resolve_single_on_load: self.resolve_single_on_load,
            surface_resolution_errors: self.surface_resolution_errors,
        }
    }

    pub fn configuration_timeout(&self) -> Duration {
        Duration::from_secs(self.configuration_timeout_secs)
    }

    pub fn resolution_timeout(&self) -> Duration {
        Duration::from_secs(self.resolution_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.configuration_timeout_secs == 0 || self.resolution_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "selection timeouts must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
