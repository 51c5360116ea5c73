//! procflow core - transactional runtime of the process engine
//!
//! This crate provides:
//! - A transaction boundary over an external two-phase-commit manager
//! - An operation execution engine with pluggable left operand handlers
//! - Flow node state-category commands and task visibility
//! - Structured logging, errors and configuration shared by the API layer
//! - In-memory reference collaborators

pub mod commands;
pub mod config;
pub mod errors;
pub mod flownode;
pub mod logging_facility;
pub mod memory;
pub mod operation;
pub mod transaction;

pub use procflow_core_types as core_types;

// Re-export commonly used types
pub use commands::{execute_command, Command, CommandOutcome, ServiceAccessor};
pub use config::EngineConfig;
pub use errors::{ExError, ExErrorKind, FlowError, Result};
pub use memory::InMemoryProcessStore;
pub use operation::{
    ContainerType, ExecutionContext, LeftOperand, LeftOperandType, Operation,
    OperationExecutionEngine,
};
pub use transaction::{TransactionContext, TransactionService};
