//! Selection session: runs the engine against real collaborators.
//!
//! The session is a single task that owns the [`SelectionEngine`]. Events
//! arrive over a channel and are applied strictly in order. Collaborator
//! calls run as spawned tasks that post their outcome back as an event, so
//! the engine is never touched concurrently. When the session ends the
//! channel closes and any late result is silently dropped.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument as _;
use url::Url;

use super::{
    engine::{EnginePolicy, Event, Effect, SelectionEngine, View},
    model::Resolution,
};
use crate::{
    client::{ClientError, ConfigurationLoader, IdentityProviderResolver, Navigator},
    config::SelectionConfig,
    validation::{UrlValidationError, login_url},
};

/// Receives view changes. Implemented by the presentation layer.
///
/// `render` is called on the session task and must not block; user input is
/// fed back through the [`SessionHandle`].
pub trait Presenter: Send {
    fn render(&mut self, view: &View, handle: &SessionHandle);
}

/// Settings for one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Base API address the login URL is built from.
    pub base_url: Url,
    pub policy: EnginePolicy,
    pub configuration_timeout: Duration,
    pub resolution_timeout: Duration,
    pub configuration_retries: u32,
    pub retry_delay: Duration,
}

impl SessionOptions {
    pub fn new(base_url: Url) -> Self {
        Self::from_config(&SelectionConfig::default(), base_url)
    }

    pub fn from_config(config: &SelectionConfig, base_url: Url) -> Self {
        Self {
            base_url,
            policy: config.engine_policy(),
            configuration_timeout: config.configuration_timeout(),
            resolution_timeout: config.resolution_timeout(),
            configuration_retries: config.configuration_retries,
            retry_delay: config.retry_delay(),
        }
    }
}

/// How a session finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The navigator was sent to the provider login page.
    Redirected { identity_provider: String, url: Url },
    /// The session was shut down before a redirect happened.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to build login URL: {0}")]
    LoginUrl(#[from] UrlValidationError),

    #[error("Failed to redirect: {0}")]
    Navigation(#[source] ClientError),
}

/// Cloneable handle used to feed user actions into a running session.
///
/// Every method returns `false` once the session has ended.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<Event>,
    shutdown: CancellationToken,
}

impl SessionHandle {
    /// Form submission: resolve the provider for this email.
    pub fn submit_email(&self, email: impl Into<String>) -> bool {
        self.send(Event::EmailSubmitted(email.into()))
    }

    /// Explicit resolution step without an email.
    pub fn request_resolution(&self) -> bool {
        self.send(Event::ResolutionRequested)
    }

    /// Start over after a resolution that found no provider.
    pub fn retry(&self) -> bool {
        self.send(Event::RetryRequested)
    }

    /// Tear the session down. In-flight requests are not cancelled, their
    /// results are dropped.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.events.is_closed() || self.shutdown.is_cancelled()
    }

    fn send(&self, event: Event) -> bool {
        !self.shutdown.is_cancelled() && self.events.send(event).is_ok()
    }
}

pub struct SelectionSession {
    engine: SelectionEngine,
    options: SessionOptions,
    loader: Arc<dyn ConfigurationLoader>,
    resolver: Arc<dyn IdentityProviderResolver>,
    navigator: Arc<dyn Navigator>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    shutdown: CancellationToken,
}

impl SelectionSession {
    pub fn new(
        options: SessionOptions,
        loader: Arc<dyn ConfigurationLoader>,
        resolver: Arc<dyn IdentityProviderResolver>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            engine: SelectionEngine::new(options.policy),
            options,
            loader,
            resolver,
            navigator,
            events_tx,
            events_rx,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            events: self.events_tx.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    pub fn engine(&self) -> &SelectionEngine {
        &self.engine
    }

    /// Drive the session until it redirects or is shut down.
    ///
    /// The presenter sees every distinct view, including the final
    /// `Redirecting` one, before the navigator is invoked.
    #[tracing::instrument(
        name = "selection.session",
        skip_all,
        fields(base_url = %self.options.base_url)
    )]
    pub async fn run<P>(mut self, presenter: &mut P) -> Result<SessionEnd, SessionError>
    where
        P: Presenter + ?Sized,
    {
        let handle = self.handle();
        let mut last_view = None;

        let effects = self.engine.start();
        self.render(presenter, &handle, &mut last_view);
        if let Some(end) = self.execute(effects)? {
            return Ok(end);
        }

        loop {
            let event = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Selection session shut down");
                    return Ok(SessionEnd::Cancelled);
                }
                event = self.events_rx.recv() => match event {
                    Some(event) => event,
                    // Unreachable while the session holds its own sender.
                    None => return Ok(SessionEnd::Cancelled),
                },
            };

            tracing::trace!(?event, "Applying event");
            let effects = self.engine.handle(event);
            self.render(presenter, &handle, &mut last_view);
            if let Some(end) = self.execute(effects)? {
                return Ok(end);
            }
        }
    }

    fn render<P>(&self, presenter: &mut P, handle: &SessionHandle, last_view: &mut Option<View>)
    where
        P: Presenter + ?Sized,
    {
        let view = self.engine.view();
        if last_view.as_ref() == Some(&view) {
            return;
        }
        tracing::debug!(?view, "View changed");
        presenter.render(&view, handle);
        *last_view = Some(view);
    }

    fn execute(&self, effects: Vec<Effect>) -> Result<Option<SessionEnd>, SessionError> {
        for effect in effects {
            match effect {
                Effect::LoadConfiguration => self.spawn_load(),
                Effect::Resolve { email } => self.spawn_resolve(email),
                Effect::Navigate { identity_provider } => {
                    let url = login_url(&self.options.base_url, &identity_provider)?;
                    tracing::info!(identity_provider = %identity_provider, url = %url, "Redirecting to identity provider");
                    self.navigator
                        .redirect(&url)
                        .map_err(SessionError::Navigation)?;
                    return Ok(Some(SessionEnd::Redirected {
                        identity_provider,
                        url,
                    }));
                }
            }
        }
        Ok(None)
    }

    fn spawn_load(&self) {
        let loader = Arc::clone(&self.loader);
        let events = self.events_tx.clone();
        let timeout = self.options.configuration_timeout;
        let retries = self.options.configuration_retries;
        let delay = self.options.retry_delay;

        tokio::spawn(
            async move {
                let mut attempt = 0;
                let event = loop {
                    let result = tokio::time::timeout(timeout, loader.load_configuration())
                        .await
                        .unwrap_or(Err(ClientError::Timeout(timeout)));
                    match result {
                        Ok(config) => break Event::ConfigurationLoaded(config),
                        Err(e) if attempt < retries => {
                            attempt += 1;
                            tracing::warn!(error = %e, attempt, retries, "Configuration fetch failed, retrying");
                            tokio::time::sleep(delay).await;
                        }
                        Err(e) => {
                            break Event::ConfigurationFailed {
                                reason: e.to_string(),
                            };
                        }
                    }
                };
                if events.send(event).is_err() {
                    tracing::debug!("Session ended before the configuration arrived");
                }
            }
            .in_current_span(),
        );
    }

    fn spawn_resolve(&self, email: Option<String>) {
        let resolver = Arc::clone(&self.resolver);
        let events = self.events_tx.clone();
        let timeout = self.options.resolution_timeout;

        tokio::spawn(
            async move {
                let result =
                    tokio::time::timeout(timeout, resolver.resolve_identity_provider(email.as_deref()))
                        .await
                        .unwrap_or(Err(ClientError::Timeout(timeout)));
                let resolution = Resolution::from_result(result);
                if events.send(Event::ResolutionCompleted(resolution)).is_err() {
                    tracing::debug!("Session ended before the resolution completed");
                }
            }
            .in_current_span(),
        );
    }
}
