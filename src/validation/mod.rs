//! Input validation shared by configuration loading and the HTTP client.

pub mod url;

pub use self::url::{UrlValidationError, endpoint_url, login_url, validate_base_url};
