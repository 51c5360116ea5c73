use super::deletion_unsupported;
use crate::errors::Result;
use crate::operation::context::{ContainerType, ExecutionContext};
use crate::operation::handler::LeftOperandHandler;
use crate::operation::model::{LeftOperand, LeftOperandType};
use crate::operation::services::DataInstanceService;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Process and activity variables
pub struct DataLeftOperandHandler {
    data: Arc<dyn DataInstanceService>,
}

impl DataLeftOperandHandler {
    pub fn new(data: Arc<dyn DataInstanceService>) -> Self {
        Self { data }
    }
}

impl LeftOperandHandler for DataLeftOperandHandler {
    fn handler_type(&self) -> LeftOperandType {
        LeftOperandType::Data
    }

    fn update(
        &self,
        left_operand: &LeftOperand,
        _input_values: &HashMap<String, Value>,
        new_value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Value> {
        self.data
            .update_value(left_operand.name(), new_value, container_id, container_type)?;
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
        left_operand: &LeftOperand,
        container_id: i64,
        container_type: ContainerType,
        context: &mut ExecutionContext,
    ) -> Result<()> {
        if context.contains(left_operand.name()) {
            return Ok(());
        }
        if let Some(value) = self
            .data
            .get_value(left_operand.name(), container_id, container_type)?
        {
            context.put(left_operand.name(), value);
        }
        Ok(())
    }

    fn load_left_operands_in_context(
        &self,
        left_operands: &[LeftOperand],
        container_id: i64,
        container_type: ContainerType,
        context: &mut ExecutionContext,
    ) -> Result<()> {
        let missing: Vec<&str> = left_operands
            .iter()
            .map(LeftOperand::name)
            .filter(|name| !context.contains(name))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        for (name, value) in self.data.get_values(&missing, container_id, container_type)? {
            context.put_if_absent(name, value);
        }
        Ok(())
    }
}
