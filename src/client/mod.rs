//! Collaborators the selection session depends on.
//!
//! The session only sees the traits below. [`SsoClient`] implements the
//! loader and the resolver over HTTP; the navigators hand the final login URL
//! to a browser or to the terminal.

mod error;
mod http;
mod navigator;

use async_trait::async_trait;
pub use error::ClientError;
pub use http::SsoClient;
#[cfg(feature = "browser")]
pub use navigator::BrowserNavigator;
pub use navigator::PrintNavigator;
use url::Url;

use crate::selection::SsoConfiguration;

/// Source of the server-published SSO configuration.
#[async_trait]
pub trait ConfigurationLoader: Send + Sync {
    async fn load_configuration(&self) -> Result<SsoConfiguration, ClientError>;
}

/// Maps optional user input to a concrete identity provider.
#[async_trait]
pub trait IdentityProviderResolver: Send + Sync {
    /// Returns `Ok(None)` when the server knows no provider for the input.
    async fn resolve_identity_provider(
        &self,
        email: Option<&str>,
    ) -> Result<Option<String>, ClientError>;
}

/// Sends the user to the provider login page.
pub trait Navigator: Send + Sync {
    fn redirect(&self, url: &Url) -> Result<(), ClientError>;
}
