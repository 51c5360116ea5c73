//! Operation execution engine
//!
//! ## Phases
//!
//! 1. **Load**: when the context belongs to the target container, stage the
//!    current value of every left operand read by a non-assignment operation,
//!    one batch call per handler type.
//! 2. **Evaluate**: in caller order, evaluate each right operand, compute the
//!    new value through the operator strategy, stage it in the context, and
//!    record a decision for its left operand.
//! 3. **Apply**: one `update` or `delete` per left operand that needs one.
//!
//! Nothing is written before every operation has been evaluated.

use crate::errors::{FlowError, Result};
use crate::operation::context::{ContainerType, EvaluatedValue, ExecutionContext};
use crate::operation::evaluator::ExpressionEvaluator;
use crate::operation::handler::LeftOperandHandlerRegistry;
use crate::operation::model::{LeftOperand, LeftOperandType, Operation, OperatorType};
use crate::operation::strategy::strategy_for;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What happens to one left operand once the batch is evaluated
#[derive(Debug, Clone, PartialEq)]
pub enum LeftOperandUpdateStatus {
    Update(Value),
    Delete,
    Skip,
}

impl LeftOperandUpdateStatus {
    pub fn should_update(&self) -> bool {
        matches!(self, LeftOperandUpdateStatus::Update(_))
    }

    pub fn should_delete(&self) -> bool {
        matches!(self, LeftOperandUpdateStatus::Delete)
    }

    /// Fold a later decision for the same left operand into this one
    ///
    /// A pending delete survives a later skip; anything else is replaced.
    pub fn merge(&mut self, later: LeftOperandUpdateStatus) {
        if self.should_delete() && !later.should_update() && !later.should_delete() {
            return;
        }
        *self = later;
    }
}

/// Decisions in the order their left operands were first seen
pub type UpdateDecisions = Vec<(LeftOperand, LeftOperandUpdateStatus)>;

pub struct OperationExecutionEngine {
    evaluator: Arc<dyn ExpressionEvaluator>,
    handlers: Arc<LeftOperandHandlerRegistry>,
    audit: bool,
}

impl OperationExecutionEngine {
    pub fn new(
        evaluator: Arc<dyn ExpressionEvaluator>,
        handlers: Arc<LeftOperandHandlerRegistry>,
    ) -> Self {
        Self {
            evaluator,
            handlers,
            audit: true,
        }
    }

    /// Toggle the per-operation audit event
    pub fn with_audit(mut self, audit: bool) -> Self {
        self.audit = audit;
        self
    }

    pub fn handlers(&self) -> &LeftOperandHandlerRegistry {
        &self.handlers
    }

    /// Execute `operations` against the container, in order
    ///
    /// # Errors
    ///
    /// `OperationExecution`, wrapping the cause, when a left operand type has
    /// no handler, loading fails, an expression fails or yields a
    /// non-serializable value, a strategy rejects the current value, or a
    /// handler fails to write.
    pub fn execute(
        &self,
        operations: &[Operation],
        container_id: i64,
        container_type: ContainerType,
        context: &mut ExecutionContext,
    ) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }

        if context.belongs_to(container_id, container_type) {
            self.load(operations, container_id, container_type, context)
                .map_err(|e| e.into_operation_execution("unable to load left operands"))?;
        }

        let decisions = self.evaluate(operations, container_id, container_type, context)?;
        self.apply(decisions, container_id, container_type, context)
    }

    fn load(
        &self,
        operations: &[Operation],
        container_id: i64,
        container_type: ContainerType,
        context: &mut ExecutionContext,
    ) -> Result<()> {
        let mut by_type: BTreeMap<LeftOperandType, Vec<LeftOperand>> = BTreeMap::new();
        for operation in operations
            .iter()
            .filter(|op| op.operator_type() != OperatorType::Assignment)
        {
            let left = operation.left_operand();
            let group = by_type.entry(left.operand_type()).or_default();
            if !group.contains(left) {
                group.push(left.clone());
            }
        }

        for (operand_type, left_operands) in by_type {
            self.handlers.get(operand_type)?.load_left_operands_in_context(
                &left_operands,
                container_id,
                container_type,
                context,
            )?;
        }
        Ok(())
    }

    fn evaluate(
        &self,
        operations: &[Operation],
        container_id: i64,
        container_type: ContainerType,
        context: &mut ExecutionContext,
    ) -> Result<UpdateDecisions> {
        let mut decisions: UpdateDecisions = Vec::new();

        for (index, operation) in operations.iter().enumerate() {
            let left = operation.left_operand();
            let strategy = strategy_for(operation.operator_type());

            let status = if strategy.is_deletion() {
                context.remove(left.name());
                LeftOperandUpdateStatus::Delete
            } else {
                let right = self.right_value(operation, context)?;
                let new_value = strategy
                    .compute_new_value(operation, right, context)
                    .map_err(|e| {
                        e.into_operation_execution(format!("unable to compute {}", left))
                    })?;
                context.put(left.name(), new_value.clone());

                let last_writer = !operations[index + 1..]
                    .iter()
                    .any(|later| later.left_operand() == left);
                if last_writer && (!new_value.is_null() || strategy.should_persist_on_null()) {
                    LeftOperandUpdateStatus::Update(new_value)
                } else {
                    LeftOperandUpdateStatus::Skip
                }
            };

            if self.audit {
                let value = match &status {
                    LeftOperandUpdateStatus::Update(v) => v.to_string(),
                    LeftOperandUpdateStatus::Delete => "<deleted>".to_string(),
                    LeftOperandUpdateStatus::Skip => context
                        .get(left.name())
                        .map(Value::to_string)
                        .unwrap_or_default(),
                };
                tracing::info!(
                    event = crate::core_types::schema::EVENT_AUDIT,
                    container_id,
                    container_type = %container_type,
                    left_operand = %left,
                    operator = %operation.operator_type(),
                    value = %value,
                );
            }

            match decisions.iter_mut().find(|(seen, _)| *seen == *left) {
                Some((_, previous)) => previous.merge(status),
                None => decisions.push((left.clone(), status)),
            }
        }

        Ok(decisions)
    }

    fn right_value(&self, operation: &Operation, context: &ExecutionContext) -> Result<Value> {
        let Some(expression) = operation.right_operand() else {
            return Ok(Value::Null);
        };
        match self.evaluator.evaluate(expression, context) {
            Ok(EvaluatedValue::Data(value)) => Ok(value),
            Ok(EvaluatedValue::Opaque(type_name)) => Err(FlowError::operation(format!(
                "value of expression '{}' for {} is not serializable ({})",
                expression.name,
                operation.left_operand(),
                type_name
            ))),
            Err(e) => Err(e.into_operation_execution(format!(
                "unable to evaluate the right operand of {}",
                operation.left_operand()
            ))),
        }
    }

    fn apply(
        &self,
        decisions: UpdateDecisions,
        container_id: i64,
        container_type: ContainerType,
        context: &mut ExecutionContext,
    ) -> Result<()> {
        for (left, status) in decisions {
            let handler = self.handlers.get(left.operand_type())?;
            match status {
                LeftOperandUpdateStatus::Update(value) => {
                    let stored = handler
                        .update(
                            &left,
                            context.input_values(),
                            &value,
                            container_id,
                            container_type,
                        )
                        .map_err(|e| {
                            e.into_operation_execution(format!("unable to update {}", left))
                        })?;
                    context.put(left.name(), stored);
                }
                LeftOperandUpdateStatus::Delete => {
                    handler
                        .delete(&left, container_id, container_type)
                        .map_err(|e| {
                            e.into_operation_execution(format!("unable to delete {}", left))
                        })?;
                }
                LeftOperandUpdateStatus::Skip => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LeftOperandUpdateStatus::{Delete, Skip, Update};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_skip_never_erases_pending_delete() {
        let mut status = Delete;
        status.merge(Skip);
        assert_eq!(status, Delete);
    }

    #[test]
    fn test_later_update_replaces_delete() {
        let mut status = Delete;
        status.merge(Update(json!(1)));
        assert_eq!(status, Update(json!(1)));
    }

    #[test]
    fn test_later_delete_replaces_anything() {
        let mut status = Update(json!(1));
        status.merge(Delete);
        assert_eq!(status, Delete);

        let mut status = Skip;
        status.merge(Delete);
        assert_eq!(status, Delete);
    }

    #[test]
    fn test_skip_replaces_non_delete() {
        let mut status = Update(json!(1));
        status.merge(Skip);
        assert_eq!(status, Skip);
    }
}
