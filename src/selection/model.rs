//! Data model shared by the selection engine and its collaborators.

use serde::{Deserialize, Serialize};

/// How the server wants the client to pick an identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionSchema {
    /// The user supplies an email address and the server maps it to an IdP.
    #[serde(rename = "email_address", alias = "email")]
    Email,
    /// Exactly one IdP is configured. No user input is needed, but the
    /// resolution still has to be requested explicitly.
    #[serde(rename = "single")]
    Single,
    /// The server picks the lowest-weight IdP as soon as it is asked.
    #[serde(rename = "lowest_weight", alias = "automatic")]
    Automatic,
}

impl std::fmt::Display for SelectionSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email_address"),
            Self::Single => write!(f, "single"),
            Self::Automatic => write!(f, "lowest_weight"),
        }
    }
}

/// SSO configuration as published by the server.
///
/// Fetched once per session and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoConfiguration {
    pub selection_schema: SelectionSchema,
}

impl SsoConfiguration {
    pub fn new(selection_schema: SelectionSchema) -> Self {
        Self { selection_schema }
    }
}

/// Outcome of one resolution attempt.
///
/// The engine stores `NoMatch` and `Failed` identically; the distinction is
/// only kept for logging and for the optional error surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    NoMatch,
    Failed(String),
}

impl Resolution {
    /// Collapse a resolver result into a resolution.
    ///
    /// Blank identifiers are treated as "no provider".
    pub fn from_result<E: std::fmt::Display>(result: Result<Option<String>, E>) -> Self {
        match result {
            Ok(Some(idp)) if !idp.trim().is_empty() => Self::Found(idp),
            Ok(_) => Self::NoMatch,
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    pub fn identity_provider(&self) -> Option<&str> {
        match self {
            Self::Found(idp) => Some(idp),
            Self::NoMatch | Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Idle,
    Fetching,
    Resolved(Option<String>),
}

/// Per-session selection state.
///
/// `fetching` and `is_resolved` are mutually exclusive, and a resolved
/// identity provider only exists once the state is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    phase: Phase,
}

impl SelectionState {
    /// Fresh state: nothing requested yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolution request is in flight.
    pub fn in_flight() -> Self {
        Self {
            phase: Phase::Fetching,
        }
    }

    /// A resolution attempt finished with the given provider (or none).
    pub fn resolved(identity_provider: Option<String>) -> Self {
        Self {
            phase: Phase::Resolved(identity_provider),
        }
    }

    pub fn fetching(&self) -> bool {
        matches!(self.phase, Phase::Fetching)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.phase, Phase::Resolved(_))
    }

    pub fn resolved_identity_provider(&self) -> Option<&str> {
        match &self.phase {
            Phase::Resolved(idp) => idp.as_deref(),
            Phase::Idle | Phase::Fetching => None,
        }
    }

    pub(crate) fn begin_fetch(&mut self) {
        self.phase = Phase::Fetching;
    }

    pub(crate) fn complete(&mut self, resolution: &Resolution) {
        self.phase = Phase::Resolved(resolution.identity_provider().map(str::to_owned));
    }

    pub(crate) fn reset(&mut self) {
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::email("email_address", SelectionSchema::Email)]
    #[case::email_alias("email", SelectionSchema::Email)]
    #[case::single("single", SelectionSchema::Single)]
    #[case::lowest_weight("lowest_weight", SelectionSchema::Automatic)]
    #[case::automatic_alias("automatic", SelectionSchema::Automatic)]
    fn test_schema_wire_names(#[case] wire: &str, #[case] expected: SelectionSchema) {
        let json = format!(r#"{{"selection_schema": "{wire}"}}"#);
        let config: SsoConfiguration = serde_json::from_str(&json).unwrap();
        assert_eq!(config.selection_schema, expected);
    }

    #[test]
    fn test_unknown_schema_rejected() {
        let result = serde_json::from_str::<SsoConfiguration>(r#"{"selection_schema": "random"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_state_is_idle() {
        let state = SelectionState::new();
        assert!(!state.fetching());
        assert!(!state.is_resolved());
        assert_eq!(state.resolved_identity_provider(), None);
    }

    #[test]
    fn test_fetching_and_resolved_are_exclusive() {
        let mut state = SelectionState::new();
        state.begin_fetch();
        assert!(state.fetching());
        assert!(!state.is_resolved());

        state.complete(&Resolution::Found("okta-1".into()));
        assert!(!state.fetching());
        assert!(state.is_resolved());
        assert_eq!(state.resolved_identity_provider(), Some("okta-1"));
    }

    #[test]
    fn test_failure_and_no_match_collapse_to_none() {
        let mut failed = SelectionState::in_flight();
        failed.complete(&Resolution::Failed("connection refused".into()));
        let mut no_match = SelectionState::in_flight();
        no_match.complete(&Resolution::NoMatch);

        assert_eq!(failed, no_match);
        assert!(failed.is_resolved());
        assert_eq!(failed.resolved_identity_provider(), None);
    }

    #[rstest]
    #[case::found(Ok(Some("okta-1".to_string())), Resolution::Found("okta-1".into()))]
    #[case::none(Ok(None), Resolution::NoMatch)]
    #[case::blank(Ok(Some("  ".to_string())), Resolution::NoMatch)]
    #[case::error(Err("boom"), Resolution::Failed("boom".into()))]
    fn test_resolution_from_result(
        #[case] result: Result<Option<String>, &'static str>,
        #[case] expected: Resolution,
    ) {
        assert_eq!(Resolution::from_result(result), expected);
    }
}
