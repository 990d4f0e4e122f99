//! Identity provider selection.
//!
//! - [`engine`]: the pure decision rule and the event-driven state machine
//! - [`model`]: configuration, selection state and resolution outcomes
//! - [`session`]: the async loop that runs the engine against real collaborators

pub mod engine;
pub mod model;
pub mod session;

pub use engine::{Decision, Effect, EnginePolicy, Event, SelectionEngine, View, decide};
pub use model::{Resolution, SelectionSchema, SelectionState, SsoConfiguration};
pub use session::{
    Presenter, SelectionSession, SessionEnd, SessionError, SessionHandle, SessionOptions,
};
