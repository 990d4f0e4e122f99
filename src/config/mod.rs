//! Configuration for the SSO selector.
//!
//! The selector is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [client]
//! base_url = "https://${SSO_HOST}/api"
//!
//! [selection]
//! configuration_retries = 2
//!
//! [observability.logging]
//! level = "debug"
//! ```

mod client;
mod observability;
mod selection;

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

pub use client::*;
pub use observability::*;
use regex::Regex;
pub use selection::*;
use serde::{Deserialize, Serialize};

/// File name looked up in the working directory and the user config dir.
pub const CONFIG_FILE_NAME: &str = "sso-selector.toml";

/// Root configuration.
///
/// Every section is optional; an empty file is a valid configuration as long
/// as the base URL is supplied some other way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorConfig {
    /// SSO server connection settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Selection session behavior (timeouts, retries, error surface).
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl SelectorConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: SelectorConfig = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section. Run again after applying command-line
    /// overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client.validate()?;
        self.selection.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Expand environment variables in the format `${VAR_NAME}`.
/// Anything after a `#` on the same line is a comment and left untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());

    for (i, line) in input.split('\n').enumerate() {
        if i > 0 {
            result.push('\n');
        }
        let comment_pos = line.find('#').unwrap_or(line.len());
        let (code, comment) = line.split_at(comment_pos);

        let mut last_end = 0;
        for cap in ENV_VAR.captures_iter(code) {
            let Some(whole) = cap.get(0) else { continue };
            let name = &cap[1];
            let value =
                std::env::var(name).map_err(|_| ConfigError::EnvVarNotFound(name.to_string()))?;
            result.push_str(&code[last_end..whole.start()]);
            result.push_str(&value);
            last_end = whole.end();
        }
        result.push_str(&code[last_end..]);
        result.push_str(comment);
    }

    Ok(result)
}
