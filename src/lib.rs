//! Client-side SSO identity provider selection.
//!
//! A login client fetches the server's SSO configuration, then either asks
//! the user for an email, resolves a provider automatically, or performs an
//! explicit resolution step, and finally redirects to the provider's login
//! page. [`selection`] holds the state machine, [`client`] the HTTP
//! collaborators and [`config`] the TOML configuration.

pub mod client;
pub mod config;
#[cfg(feature = "cli")]
pub mod observability;
#[cfg(feature = "cli")]
pub mod prompt;
pub mod selection;
pub mod validation;
