//! Core types shared across procflow facilities
//!
//! This crate provides foundational types used by the error, logging and
//! transaction facilities:
//!
//! - **Correlation types**: RequestId, TraceId, AssociationId, RequestContext
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{AssociationId, RequestContext, RequestId, TraceId};
