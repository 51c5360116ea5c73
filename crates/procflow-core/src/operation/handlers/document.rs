//! Single documents and document lists
//!
//! A document value is a JSON object (name, content type, url or content).
//! Writing null to a document removes it.

use crate::errors::{FlowError, Result};
use crate::operation::context::{ContainerType, ExecutionContext};
use crate::operation::handler::LeftOperandHandler;
use crate::operation::model::{LeftOperand, LeftOperandType};
use crate::operation::services::DocumentService;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct DocumentLeftOperandHandler {
    documents: Arc<dyn DocumentService>,
}

impl DocumentLeftOperandHandler {
    pub fn new(documents: Arc<dyn DocumentService>) -> Self {
        Self { documents }
    }
}

impl LeftOperandHandler for DocumentLeftOperandHandler {
    fn handler_type(&self) -> LeftOperandType {
        LeftOperandType::Document
    }

    fn update(
        &self,
        left_operand: &LeftOperand,
        _input_values: &HashMap<String, Value>,
        new_value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Value> {
        match new_value {
            Value::Null => {
                self.documents
                    .remove_document(left_operand.name(), container_id, container_type)?;
            }
            Value::Object(_) => {
                self.documents.set_document(
                    left_operand.name(),
                    new_value,
                    container_id,
                    container_type,
                )?;
            }
            _ => {
                return Err(FlowError::operation(format!(
                    "document {} must be an object",
                    left_operand.name()
                )))
            }
        }
        Ok(new_value.clone())
    }

    fn delete(
        &self,
        left_operand: &LeftOperand,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()> {
        self.documents
            .remove_document(left_operand.name(), container_id, container_type)
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
        if let Some(document) =
            self.documents
                .get_document(left_operand.name(), container_id, container_type)?
        {
            context.put(left_operand.name(), document);
        }
        Ok(())
    }
}

pub struct DocumentListLeftOperandHandler {
    documents: Arc<dyn DocumentService>,
}

impl DocumentListLeftOperandHandler {
    pub fn new(documents: Arc<dyn DocumentService>) -> Self {
        Self { documents }
    }
}

impl LeftOperandHandler for DocumentListLeftOperandHandler {
    fn handler_type(&self) -> LeftOperandType {
        LeftOperandType::DocumentList
    }

    fn update(
        &self,
        left_operand: &LeftOperand,
        _input_values: &HashMap<String, Value>,
        new_value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Value> {
        let documents: &[Value] = match new_value {
            Value::Null => &[],
            Value::Array(items) => items,
            _ => {
                return Err(FlowError::operation(format!(
                    "document list {} must be a list",
                    left_operand.name()
                )))
            }
        };
        self.documents.set_document_list(
            left_operand.name(),
            documents,
            container_id,
            container_type,
        )?;
        Ok(Value::Array(documents.to_vec()))
    }

    fn delete(
        &self,
        left_operand: &LeftOperand,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()> {
        self.documents
            .remove_document_list(left_operand.name(), container_id, container_type)
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
        let documents = self
            .documents
            .get_document_list(left_operand.name(), container_id, container_type)?
            .unwrap_or_default();
        context.put(left_operand.name(), Value::Array(documents));
        Ok(())
    }
}
