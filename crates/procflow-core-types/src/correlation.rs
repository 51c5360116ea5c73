//! Correlation identifiers
//!
//! `RequestId` and `TraceId` tie log events of one API call together.
//! `AssociationId` names an execution context towards the transaction manager:
//! every `TransactionContext` owns one, and the manager keys its in-flight
//! transactions by it instead of by OS thread.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! correlation_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh, time-ordered id (UUIDv7)
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Wrap an id received from elsewhere (headers, persisted rows)
            pub fn from_string(s: String) -> Self {
                Self(s)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

correlation_id!(
    /// Unique identifier for a single API request
    RequestId
);

correlation_id!(
    /// Trace identifier propagated from the caller, if any
    TraceId
);

correlation_id!(
    /// Identity of one execution context as seen by the transaction manager
    AssociationId
);

/// Context carried through the public API for correlation
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub trace_id: Option<TraceId>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            trace_id: None,
        }
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_association_ids_are_distinct() {
        let a = AssociationId::new();
        let b = AssociationId::new();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_display_matches_as_str() {
        let id = RequestId::new();
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn test_request_context_with_trace_id() {
        let trace_id = TraceId::from_string("trace-1".to_string());
        let ctx = RequestContext::new().with_trace_id(trace_id.clone());
        assert_eq!(ctx.trace_id, Some(trace_id));
    }

    #[test]
    fn test_serialization_is_transparent_string() {
        let id = AssociationId::from_string("assoc-7".to_string());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"assoc-7\"");
        let back: AssociationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
