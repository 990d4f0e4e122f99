//! Base URL validation and login URL construction.
//!
//! The base URL comes from configuration or the command line and ends up in
//! the browser, so it is checked once up front instead of on every request.

use std::net::IpAddr;

use url::Url;

/// Errors from URL validation.
#[derive(Debug, thiserror::Error)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL scheme must be http or https")]
    InvalidScheme,

    #[error("URL must include a hostname")]
    MissingHost,

    #[error("URL must not carry a query string or fragment")]
    UnexpectedSuffix,

    #[error("URL points at a loopback or unspecified address")]
    BlockedAddress,

    #[error("Identity provider identifier must not be empty")]
    EmptyIdentityProvider,

    #[error("Identity provider identifier must not be a dot segment: {0}")]
    DotSegmentIdentityProvider(String),
}

fn is_blocked_ip(ip: IpAddr, allow_loopback: bool) -> bool {
    if ip.is_unspecified() {
        return true;
    }
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() && !allow_loopback,
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_blocked_ip(IpAddr::V4(v4), allow_loopback);
            }
            v6.is_loopback() && !allow_loopback
        }
    }
}

/// Validate and normalize the server base URL.
///
/// Rejects:
/// - Non-http(s) schemes
/// - URLs without a hostname
/// - Query strings and fragments (paths are appended to the base)
/// - Loopback hosts unless `allow_loopback` is set, and unspecified addresses
///
/// The returned URL always ends with a `/` so relative joins keep its path.
pub fn validate_base_url(url: &str, allow_loopback: bool) -> Result<Url, UrlValidationError> {
    let mut parsed =
        Url::parse(url.trim()).map_err(|e| UrlValidationError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlValidationError::InvalidScheme),
    }

    let host = parsed
        .host_str()
        .ok_or(UrlValidationError::MissingHost)?
        .to_owned();

    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(UrlValidationError::UnexpectedSuffix);
    }

    if !allow_loopback
        && (host.eq_ignore_ascii_case("localhost")
            || host.eq_ignore_ascii_case("localhost.localdomain"))
    {
        return Err(UrlValidationError::BlockedAddress);
    }

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>()
        && is_blocked_ip(ip, allow_loopback)
    {
        return Err(UrlValidationError::BlockedAddress);
    }

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

/// Join an absolute API path (e.g. `/auth/sso/config/`) onto the base URL.
pub fn endpoint_url(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    base.join(path.trim_start_matches('/'))
}

/// Build `{base}/auth/sso/{identity_provider}/login/`.
///
/// The identifier is percent-encoded as a single path segment so it cannot
/// escape the login route. Blank identifiers and the `.` / `..` dot segments
/// are rejected.
pub fn login_url(base: &Url, identity_provider: &str) -> Result<Url, UrlValidationError> {
    let identity_provider = identity_provider.trim();
    if identity_provider.is_empty() {
        return Err(UrlValidationError::EmptyIdentityProvider);
    }
    // `.` and `..` are dropped or resolved by the path serializer.
    if matches!(identity_provider, "." | "..") {
        return Err(UrlValidationError::DotSegmentIdentityProvider(
            identity_provider.to_owned(),
        ));
    }

    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| UrlValidationError::InvalidUrl(base.to_string()))?;
        segments
            .pop_if_empty()
            .extend(["auth", "sso", identity_provider, "login", ""]);
    }
    Ok(url)
}
