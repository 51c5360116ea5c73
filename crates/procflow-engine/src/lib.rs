//! procflow engine - public API layer
//!
//! Wires the core collaborators into a [`ProcessRuntime`] and runs each
//! command inside its own transaction boundary.

pub mod commands;
pub mod runtime;

pub use commands::engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
pub use runtime::ProcessRuntime;
