//! Terminal presenter for the selection session.
//!
//! Renders views to stderr and collects input with `dialoguer`. Prompts block,
//! so they run on the blocking pool and report back through the
//! [`SessionHandle`].

use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use validator::ValidateEmail;

use crate::selection::{Presenter, SessionHandle, View};

/// Prompt errors.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Dialoguer error: {0}")]
    Dialoguer(#[from] dialoguer::Error),
}

/// Presenter that talks to a human on the terminal.
///
/// With a preset email the form is submitted without prompting, once. A
/// rejected preset falls back to the interactive prompt on retry.
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    email: Option<String>,
    interactive: bool,
}

impl TerminalPresenter {
    pub fn new(email: Option<String>) -> Self {
        Self {
            email,
            interactive: true,
        }
    }

    /// Never prompt. Forms without a preset email and failures end the
    /// session instead.
    pub fn non_interactive(email: Option<String>) -> Self {
        Self {
            email,
            interactive: false,
        }
    }

    fn ask_email(&self, handle: &SessionHandle) {
        if !self.interactive {
            tracing::error!("An email address is required, pass --email");
            handle.shutdown();
            return;
        }
        let handle = handle.clone();
        tokio::task::spawn_blocking(move || match prompt_email() {
            Ok(email) => {
                handle.submit_email(email);
            }
            Err(e) => {
                tracing::error!(error = %e, "Email prompt failed");
                handle.shutdown();
            }
        });
    }

    fn ask_retry(&self, handle: &SessionHandle) {
        if !self.interactive {
            handle.shutdown();
            return;
        }
        let handle = handle.clone();
        tokio::task::spawn_blocking(move || match confirm_retry() {
            Ok(true) => {
                handle.retry();
            }
            Ok(false) => handle.shutdown(),
            Err(e) => {
                tracing::error!(error = %e, "Retry prompt failed");
                handle.shutdown();
            }
        });
    }
}

impl Presenter for TerminalPresenter {
    fn render(&mut self, view: &View, handle: &SessionHandle) {
        match view {
            View::Loading => eprintln!("Loading..."),
            View::EmailForm { fetching: true } => {}
            View::EmailForm { fetching: false } => match self.email.take() {
                Some(email) => {
                    handle.submit_email(email);
                }
                None => self.ask_email(handle),
            },
            View::Redirecting { identity_provider } => {
                eprintln!("Redirecting to {identity_provider}...");
            }
            View::ResolutionFailed { reason } => {
                eprintln!("Could not find an identity provider: {reason}");
                self.ask_retry(handle);
            }
        }
    }
}

/// Ask for an email until a well-formed one is entered.
pub fn prompt_email() -> Result<String, PromptError> {
    let email: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Email")
        .validate_with(|input: &String| -> Result<(), &str> {
            if is_valid_email(input) {
                Ok(())
            } else {
                Err("Please enter a valid email address")
            }
        })
        .interact_text()?;
    Ok(email.trim().to_owned())
}

pub fn confirm_retry() -> Result<bool, PromptError> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Try again?")
        .default(true)
        .interact()?)
}

pub fn is_valid_email(input: &str) -> bool {
    input.trim().validate_email()
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use rstest::rstest;
    use url::Url;

    use super::*;
    use crate::{
        client::{ClientError, ConfigurationLoader, IdentityProviderResolver, PrintNavigator},
        selection::{
            SelectionSchema, SelectionSession, SessionEnd, SessionOptions, SsoConfiguration,
        },
    };

    #[rstest]
    #[case("user@example.com", true)]
    #[case("  user@example.com ", true)]
    #[case("user@", false)]
    #[case("not an email", false)]
    #[case("", false)]
    fn test_email_check(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(is_valid_email(input), valid);
    }

    struct EmailSchema;

    #[async_trait]
    impl ConfigurationLoader for EmailSchema {
        async fn load_configuration(&self) -> Result<SsoConfiguration, ClientError> {
            Ok(SsoConfiguration::new(SelectionSchema::Email))
        }
    }

    struct Known;

    #[async_trait]
    impl IdentityProviderResolver for Known {
        async fn resolve_identity_provider(
            &self,
            email: Option<&str>,
        ) -> Result<Option<String>, ClientError> {
            Ok((email == Some("user@example.com")).then(|| "okta-1".to_string()))
        }
    }

    fn session() -> SelectionSession {
        let mut options = SessionOptions::new(Url::parse("https://sso.example.com/").unwrap());
        options.policy.surface_resolution_errors = true;
        SelectionSession::new(
            options,
            Arc::new(EmailSchema),
            Arc::new(Known),
            Arc::new(PrintNavigator),
        )
    }

    #[tokio::test]
    async fn test_preset_email_is_submitted() {
        let mut presenter = TerminalPresenter::non_interactive(Some("user@example.com".into()));
        let end = tokio::time::timeout(Duration::from_secs(5), session().run(&mut presenter))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(end, SessionEnd::Redirected { identity_provider, .. } if identity_provider == "okta-1"));
    }

    #[tokio::test]
    async fn test_non_interactive_failure_ends_session() {
        let mut presenter = TerminalPresenter::non_interactive(Some("nobody@example.com".into()));
        let end = tokio::time::timeout(Duration::from_secs(5), session().run(&mut presenter))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(end, SessionEnd::Cancelled);
    }

    #[tokio::test]
    async fn test_non_interactive_without_email_ends_session() {
        let mut presenter = TerminalPresenter::non_interactive(None);
        let end = tokio::time::timeout(Duration::from_secs(5), session().run(&mut presenter))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(end, SessionEnd::Cancelled);
    }
}
