use std::time::Duration;

use reqwest::StatusCode;

/// Errors raised by the collaborators the selection session talks to.
///
/// None of these reach the presentation layer: the session folds them into
/// engine events.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The call did not finish in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// A URL could not be built from the configured base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configured base URL was rejected
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] crate::validation::UrlValidationError),

    /// The navigator could not hand the login URL over
    #[error("Failed to open {url}: {reason}")]
    Navigation { url: String, reason: String },
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}
