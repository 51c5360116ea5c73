use crate::errors::Result;
use crate::operation::context::{ContainerType, ExecutionContext};
use crate::operation::handler::LeftOperandHandler;
use crate::operation::model::{LeftOperand, LeftOperandType};
use crate::operation::services::BusinessDataService;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Business objects; the store may enrich the object (ids, versions) on write
pub struct BusinessDataLeftOperandHandler {
    business_data: Arc<dyn BusinessDataService>,
}

impl BusinessDataLeftOperandHandler {
    pub fn new(business_data: Arc<dyn BusinessDataService>) -> Self {
        Self { business_data }
    }
}

impl LeftOperandHandler for BusinessDataLeftOperandHandler {
    fn handler_type(&self) -> LeftOperandType {
        LeftOperandType::BusinessData
    }

    fn update(
        &self,
        left_operand: &LeftOperand,
        _input_values: &HashMap<String, Value>,
        new_value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Value> {
        self.business_data.put_business_data(
            left_operand.name(),
            new_value,
            container_id,
            container_type,
        )
    }

    fn delete(
        &self,
        left_operand: &LeftOperand,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()> {
        self.business_data
            .remove_business_data(left_operand.name(), container_id, container_type)
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
        if let Some(value) = self.business_data.get_business_data(
            left_operand.name(),
            container_id,
            container_type,
        )? {
            context.put(left_operand.name(), value);
        }
        Ok(())
    }
}
