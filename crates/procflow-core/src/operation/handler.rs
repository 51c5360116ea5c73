//! Left operand handlers and their registry

use crate::errors::{FlowError, Result};
use crate::operation::context::{ContainerType, ExecutionContext};
use crate::operation::model::{LeftOperand, LeftOperandType};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Reads and writes one kind of left operand in its backing store
pub trait LeftOperandHandler: Send + Sync {
    fn handler_type(&self) -> LeftOperandType;

    /// Write `new_value` and return the value the store now holds
    ///
    /// # Errors
    ///
    /// Store failures.
    fn update(
        &self,
        left_operand: &LeftOperand,
        input_values: &HashMap<String, Value>,
        new_value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Value>;

    /// # Errors
    ///
    /// Store failures, or `OperationExecution` when the store has no notion
    /// of deletion.
    fn delete(
        &self,
        left_operand: &LeftOperand,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()>;

    /// Stage the current value of one left operand in `context`
    ///
    /// # Errors
    ///
    /// Store failures.
    fn load_left_operand_in_context(
        &self,
        left_operand: &LeftOperand,
        container_id: i64,
        container_type: ContainerType,
        context: &mut ExecutionContext,
    ) -> Result<()>;

    /// Batch form of `load_left_operand_in_context`
    ///
    /// # Errors
    ///
    /// The first store failure.
    fn load_left_operands_in_context(
        &self,
        left_operands: &[LeftOperand],
        container_id: i64,
        container_type: ContainerType,
        context: &mut ExecutionContext,
    ) -> Result<()> {
        for left_operand in left_operands {
            self.load_left_operand_in_context(left_operand, container_id, container_type, context)?;
        }
        Ok(())
    }
}

/// Immutable `type → handler` map
pub struct LeftOperandHandlerRegistry {
    handlers: HashMap<LeftOperandType, Arc<dyn LeftOperandHandler>>,
}

impl LeftOperandHandlerRegistry {
    /// Later handlers replace earlier ones of the same type
    pub fn new(handlers: Vec<Arc<dyn LeftOperandHandler>>) -> Self {
        let mut map: HashMap<LeftOperandType, Arc<dyn LeftOperandHandler>> = HashMap::new();
        for handler in handlers {
            let handler_type = handler.handler_type();
            if map.insert(handler_type, handler).is_some() {
                tracing::warn!(
                    handler_type = %handler_type,
                    "duplicate left operand handler registered, keeping the last one"
                );
            }
        }
        Self { handlers: map }
    }

    /// # Errors
    ///
    /// `OperationExecution` when no handler is registered for the type.
    pub fn get(&self, handler_type: LeftOperandType) -> Result<&Arc<dyn LeftOperandHandler>> {
        self.handlers.get(&handler_type).ok_or_else(|| {
            FlowError::operation(format!("Left operand type not found: {}", handler_type))
        })
    }

    pub fn registered_types(&self) -> Vec<LeftOperandType> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort();
        types
    }
}

impl std::fmt::Debug for LeftOperandHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeftOperandHandlerRegistry")
            .field("types", &self.registered_types())
            .finish()
    }
}
