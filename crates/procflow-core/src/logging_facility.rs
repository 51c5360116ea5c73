//! Structured logging facility for procflow
//!
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Per-operation audit events emitted by the operation engine
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use procflow_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
