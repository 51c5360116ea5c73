use super::deletion_unsupported;
use crate::errors::Result;
use crate::operation::context::{ContainerType, ExecutionContext};
use crate::operation::handler::LeftOperandHandler;
use crate::operation::model::{LeftOperand, LeftOperandType};
use serde_json::Value;
use std::collections::HashMap;

/// Data owned by the caller: nothing is loaded or stored
#[derive(Debug, Default, Clone, Copy)]
pub struct ExternalDataLeftOperandHandler;

impl LeftOperandHandler for ExternalDataLeftOperandHandler {
    fn handler_type(&self) -> LeftOperandType {
        LeftOperandType::ExternalData
    }

    fn update(
        &self,
        _left_operand: &LeftOperand,
        _input_values: &HashMap<String, Value>,
        new_value: &Value,
        _container_id: i64,
        _container_type: ContainerType,
    ) -> Result<Value> {
        Ok(new_value.clone())
    }

    fn delete(
        &self,
        left_operand: &LeftOperand,
        _container_id: i64,
        _container_type: ContainerType,
    ) -> Result<()> {
        Err(deletion_unsupported(left_operand))
    }

    fn load_left_operand_in_context(
        &self,
        _left_operand: &LeftOperand,
        _container_id: i64,
        _container_type: ContainerType,
        _context: &mut ExecutionContext,
    ) -> Result<()> {
        Ok(())
    }
}
