//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names stable across the logging macros, the
//! operation audit trail and the test capture layer.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_ASSOCIATION_ID: &str = "association_id";

// Entity identifiers
pub const FIELD_CONTAINER_ID: &str = "container_id";
pub const FIELD_CONTAINER_TYPE: &str = "container_type";
pub const FIELD_LEFT_OPERAND: &str = "left_operand";
pub const FIELD_OPERATOR: &str = "operator";
pub const FIELD_VALUE: &str = "value";
pub const FIELD_FLOW_NODE_ID: &str = "flow_node_id";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_AUDIT: &str = "audit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_distinct() {
        let events = [EVENT_START, EVENT_END, EVENT_END_ERROR, EVENT_AUDIT];
        for (i, a) in events.iter().enumerate() {
            for b in &events[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_audit_fields_non_empty() {
        for field in [
            FIELD_CONTAINER_ID,
            FIELD_CONTAINER_TYPE,
            FIELD_LEFT_OPERAND,
            FIELD_OPERATOR,
            FIELD_VALUE,
        ] {
            assert!(!field.is_empty());
        }
    }
}
