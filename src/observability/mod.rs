//! Observability: structured logging setup for the command-line client.

mod tracing_init;

pub use tracing_init::*;
