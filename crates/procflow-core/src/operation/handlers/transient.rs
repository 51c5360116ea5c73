use super::deletion_unsupported;
use crate::errors::Result;
use crate::operation::context::{ContainerType, ExecutionContext};
use crate::operation::handler::LeftOperandHandler;
use crate::operation::model::{LeftOperand, LeftOperandType};
use crate::operation::services::TransientDataService;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct TransientDataLeftOperandHandler {
    transient: Arc<dyn TransientDataService>,
}

impl TransientDataLeftOperandHandler {
    pub fn new(transient: Arc<dyn TransientDataService>) -> Self {
        Self { transient }
    }
}

impl LeftOperandHandler for TransientDataLeftOperandHandler {
    fn handler_type(&self) -> LeftOperandType {
        LeftOperandType::TransientData
    }

    fn update(
        &self,
        left_operand: &LeftOperand,
        _input_values: &HashMap<String, Value>,
        new_value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Value> {
        self.transient
            .set_transient(left_operand.name(), new_value, container_id, container_type)?;
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
        match self
            .transient
            .get_transient(left_operand.name(), container_id, container_type)?
        {
            Some(value) => context.put(left_operand.name(), value),
            // transient values vanish on restart; the flow node simply sees null
            None => tracing::debug!(
                name = left_operand.name(),
                container_id,
                "transient data has no value"
            ),
        }
        Ok(())
    }
}
