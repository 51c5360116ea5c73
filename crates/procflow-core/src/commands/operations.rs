use crate::errors::Result;
use crate::operation::context::{ContainerType, ExecutionContext};
use crate::operation::engine::OperationExecutionEngine;
use crate::operation::model::Operation;
use serde_json::Value;
use std::collections::HashMap;

/// Run an operation batch on a container and return the resulting context
/// values
///
/// # Errors
///
/// `OperationExecution` from the engine.
pub fn apply_operations(
    engine: &OperationExecutionEngine,
    operations: &[Operation],
    container_id: i64,
    container_type: ContainerType,
    input_values: HashMap<String, Value>,
) -> Result<HashMap<String, Value>> {
    let mut context =
        ExecutionContext::new(container_id, container_type).with_input_values(input_values);
    engine.execute(operations, container_id, container_type, &mut context)?;
    Ok(context.input_values().clone())
}
