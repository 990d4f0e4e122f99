use url::Url;

use super::{ClientError, Navigator};

/// Opens the login URL in the system browser.
#[cfg(feature = "browser")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserNavigator;

#[cfg(feature = "browser")]
impl Navigator for BrowserNavigator {
    fn redirect(&self, url: &Url) -> Result<(), ClientError> {
        match open::that(url.as_str()) {
            Ok(()) => {
                tracing::info!(url = %url, "Opened browser");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %url, "Failed to open browser");
                Err(ClientError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Prints the login URL to stdout for the user (or a script) to follow.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn redirect(&self, url: &Url) -> Result<(), ClientError> {
        println!("{url}");
        Ok(())
    }
}
