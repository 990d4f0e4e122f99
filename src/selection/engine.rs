//! Identity provider selection state machine.
//!
//! [`decide`] is the pure decision rule. [`SelectionEngine`] owns the session
//! state, applies [`Event`]s to it and returns the [`Effect`]s the caller has
//! to execute. The engine never performs I/O itself.

use super::model::{Resolution, SelectionSchema, SelectionState, SsoConfiguration};

/// Result of evaluating the decision rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    ShowLoadingIndicator,
    ShowEmailForm { fetching: bool },
    /// Not a render state: asks the caller to start a resolution.
    RequestResolution { email: Option<String> },
    Redirect { identity_provider: String },
}

/// Decide what the client should do next.
///
/// A resolved provider always wins. Nothing is requested before the
/// configuration is known, and nothing is requested while a resolution is
/// in flight.
pub fn decide(config: Option<&SsoConfiguration>, state: &SelectionState) -> Decision {
    if let Some(idp) = state.resolved_identity_provider() {
        return Decision::Redirect {
            identity_provider: idp.to_owned(),
        };
    }

    let Some(config) = config else {
        return Decision::ShowLoadingIndicator;
    };

    match config.selection_schema {
        SelectionSchema::Automatic if !state.is_resolved() && !state.fetching() => {
            Decision::RequestResolution { email: None }
        }
        SelectionSchema::Email if !state.fetching() && !state.is_resolved() => {
            Decision::ShowEmailForm { fetching: false }
        }
        // Resolved to nothing is a dead end that keeps the spinner; anything
        // else is waiting on the resolver or on an explicit resolution step.
        _ => Decision::ShowLoadingIndicator,
    }
}

/// Inputs that change the engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ConfigurationLoaded(SsoConfiguration),
    ConfigurationFailed { reason: String },
    EmailSubmitted(String),
    /// Explicit resolution step without an email.
    ResolutionRequested,
    ResolutionCompleted(Resolution),
    RetryRequested,
}

/// Side effects requested by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadConfiguration,
    Resolve { email: Option<String> },
    Navigate { identity_provider: String },
}

/// What the presentation layer should currently show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Loading,
    /// `fetching` is always `false` from the engine, which shows `Loading`
    /// while a submission is in flight. Presenters that disable the form
    /// themselves may still construct it.
    EmailForm { fetching: bool },
    Redirecting { identity_provider: String },
    /// Only produced when resolution errors are surfaced.
    ResolutionFailed { reason: String },
}

/// Behavior switches for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnginePolicy {
    /// Perform the explicit resolution step as soon as a `single` schema
    /// configuration arrives.
    pub resolve_single_on_load: bool,
    /// Render [`View::ResolutionFailed`] instead of the loading dead end and
    /// accept [`Event::RetryRequested`].
    pub surface_resolution_errors: bool,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            resolve_single_on_load: true,
            surface_resolution_errors: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionEngine {
    policy: EnginePolicy,
    config: Option<SsoConfiguration>,
    state: SelectionState,
    last_failure: Option<String>,
    started: bool,
    redirected_to: Option<String>,
}

impl SelectionEngine {
    pub fn new(policy: EnginePolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> EnginePolicy {
        self.policy
    }

    pub fn config(&self) -> Option<&SsoConfiguration> {
        self.config.as_ref()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// True once a redirect has been issued. No further event is applied.
    pub fn is_terminal(&self) -> bool {
        self.redirected_to.is_some()
    }

    pub fn decision(&self) -> Decision {
        decide(self.config.as_ref(), &self.state)
    }

    /// Effects to run when the session starts. Only the first call returns
    /// anything.
    pub fn start(&mut self) -> Vec<Effect> {
        if std::mem::replace(&mut self.started, true) {
            return Vec::new();
        }
        vec![Effect::LoadConfiguration]
    }

    /// Apply an event and return the effects it triggers.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        if let Some(idp) = &self.redirected_to {
            tracing::debug!(identity_provider = %idp, ?event, "Ignoring event after redirect");
            return Vec::new();
        }

        let mut effects = Vec::new();

        match event {
            Event::ConfigurationLoaded(config) => {
                if let Some(existing) = &self.config {
                    tracing::warn!(
                        current = %existing.selection_schema,
                        received = %config.selection_schema,
                        "SSO configuration already loaded, ignoring"
                    );
                    return effects;
                }
                tracing::debug!(schema = %config.selection_schema, "SSO configuration loaded");
                let single = config.selection_schema == SelectionSchema::Single;
                self.config = Some(config);
                if single && self.policy.resolve_single_on_load {
                    effects.extend(self.request_resolution(None));
                }
            }
            Event::ConfigurationFailed { reason } => {
                tracing::warn!(reason = %reason, "SSO configuration unavailable");
                return effects;
            }
            Event::EmailSubmitted(email) => {
                let email = email.trim();
                if email.is_empty() {
                    tracing::debug!("Ignoring empty email submission");
                    return effects;
                }
                if !matches!(self.decision(), Decision::ShowEmailForm { .. }) {
                    tracing::debug!(
                        fetching = self.state.fetching(),
                        resolved = self.state.is_resolved(),
                        "Email form not active, suppressing submission"
                    );
                    return effects;
                }
                effects.extend(self.request_resolution(Some(email.to_owned())));
            }
            Event::ResolutionRequested => {
                // Email schemas resolve through the form only.
                let email_less = self.config.as_ref().is_some_and(|c| {
                    matches!(
                        c.selection_schema,
                        SelectionSchema::Single | SelectionSchema::Automatic
                    )
                });
                if !email_less || self.state.fetching() || self.state.is_resolved() {
                    tracing::debug!(
                        configured = self.config.is_some(),
                        email_less,
                        fetching = self.state.fetching(),
                        resolved = self.state.is_resolved(),
                        "Suppressing resolution request"
                    );
                    return effects;
                }
                effects.extend(self.request_resolution(None));
            }
            Event::ResolutionCompleted(resolution) => {
                if !self.state.fetching() {
                    tracing::debug!(?resolution, "Dropping resolution result with nothing in flight");
                    return effects;
                }
                match &resolution {
                    Resolution::Found(idp) => {
                        tracing::info!(identity_provider = %idp, "Identity provider resolved");
                        self.last_failure = None;
                    }
                    Resolution::NoMatch => {
                        tracing::info!("No identity provider matched");
                        self.last_failure = Some("No identity provider matched".to_owned());
                    }
                    Resolution::Failed(reason) => {
                        tracing::warn!(reason = %reason, "Identity provider resolution failed");
                        self.last_failure = Some(reason.clone());
                    }
                }
                self.state.complete(&resolution);
            }
            Event::RetryRequested => {
                let dead_end =
                    self.state.is_resolved() && self.state.resolved_identity_provider().is_none();
                if !self.policy.surface_resolution_errors || !dead_end {
                    tracing::debug!(dead_end, "Ignoring retry request");
                    return effects;
                }
                self.state.reset();
                self.last_failure = None;
                let single = self
                    .config
                    .as_ref()
                    .is_some_and(|c| c.selection_schema == SelectionSchema::Single);
                if single && self.policy.resolve_single_on_load {
                    effects.extend(self.request_resolution(None));
                }
            }
        }

        effects.extend(self.evaluate());
        effects
    }

    /// Current render state.
    pub fn view(&self) -> View {
        match self.decision() {
            Decision::Redirect { identity_provider } => View::Redirecting { identity_provider },
            Decision::ShowEmailForm { fetching } => View::EmailForm { fetching },
            Decision::ShowLoadingIndicator | Decision::RequestResolution { .. } => {
                if self.policy.surface_resolution_errors && self.state.is_resolved() {
                    View::ResolutionFailed {
                        reason: self.last_failure.clone().unwrap_or_default(),
                    }
                } else {
                    View::Loading
                }
            }
        }
    }

    fn request_resolution(&mut self, email: Option<String>) -> Option<Effect> {
        if self.state.fetching() {
            return None;
        }
        self.state.begin_fetch();
        Some(Effect::Resolve { email })
    }

    /// Re-run the decision rule and turn actionable decisions into effects.
    fn evaluate(&mut self) -> Vec<Effect> {
        match self.decision() {
            Decision::RequestResolution { email } => {
                self.request_resolution(email).into_iter().collect()
            }
            Decision::Redirect { identity_provider } => {
                self.redirected_to = Some(identity_provider.clone());
                vec![Effect::Navigate { identity_provider }]
            }
            Decision::ShowLoadingIndicator | Decision::ShowEmailForm { .. } => Vec::new(),
        }
    }
}
