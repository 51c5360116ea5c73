//! Command orchestration layer.
//!
//! Opens the transaction boundary around core commands and owns their
//! lifecycle logging.

pub mod engine_command;
