//! Operator strategies
//!
//! One strategy per [`OperatorType`]. A strategy computes the value a left
//! operand takes after the operation, from the evaluated right operand and the
//! value currently staged in the execution context.

use crate::errors::{FlowError, Result};
use crate::operation::context::ExecutionContext;
use crate::operation::model::{Operation, OperatorType};
use serde_json::{Map, Value};

pub trait OperationExecutorStrategy: Send + Sync {
    /// # Errors
    ///
    /// `OperationExecution` when the operator does not apply to the current
    /// value.
    fn compute_new_value(
        &self,
        operation: &Operation,
        right: Value,
        context: &ExecutionContext,
    ) -> Result<Value>;

    /// Whether a null result is still written to the store
    fn should_persist_on_null(&self) -> bool;

    /// Deletion strategies yield a delete decision instead of a value
    fn is_deletion(&self) -> bool {
        false
    }
}

pub fn strategy_for(operator_type: OperatorType) -> &'static dyn OperationExecutorStrategy {
    match operator_type {
        OperatorType::Assignment => &AssignmentStrategy,
        OperatorType::JavaMethod => &JavaMethodStrategy,
        OperatorType::XPathUpdate => &XPathUpdateStrategy,
        OperatorType::RecordInList => &RecordInListStrategy,
        OperatorType::Deletion => &DeletionStrategy,
    }
}

fn current_value(operation: &Operation, context: &ExecutionContext) -> Value {
    context
        .get(operation.left_operand().name())
        .cloned()
        .unwrap_or(Value::Null)
}

fn required_operator(operation: &Operation) -> Result<&str> {
    operation.operator().ok_or_else(|| {
        FlowError::operation(format!(
            "{} on {} needs an operator",
            operation.operator_type(),
            operation.left_operand()
        ))
    })
}

pub struct AssignmentStrategy;

impl OperationExecutorStrategy for AssignmentStrategy {
    fn compute_new_value(
        &self,
        _operation: &Operation,
        right: Value,
        _context: &ExecutionContext,
    ) -> Result<Value> {
        Ok(right)
    }

    fn should_persist_on_null(&self) -> bool {
        true
    }
}

/// Calls a collection method on the current value
///
/// Supported methods: `add`, `addAll`, `remove`, `clear`, `set`. Anything
/// after a `:` in the operator is an argument type and is ignored.
pub struct JavaMethodStrategy;

impl OperationExecutorStrategy for JavaMethodStrategy {
    fn compute_new_value(
        &self,
        operation: &Operation,
        right: Value,
        context: &ExecutionContext,
    ) -> Result<Value> {
        let operator = required_operator(operation)?;
        let method = operator.split(':').next().unwrap_or(operator);
        let left = operation.left_operand();
        let current = current_value(operation, context);

        let not_a_list = || {
            FlowError::operation(format!(
                "{} cannot call {} on a value that is not a list",
                left, method
            ))
        };

        match method {
            "set" => Ok(right),
            "clear" => match current {
                Value::Array(_) | Value::Null => Ok(Value::Array(Vec::new())),
                Value::Object(_) => Ok(Value::Object(Map::new())),
                _ => Err(not_a_list()),
            },
            "add" => match current {
                Value::Array(mut items) => {
                    items.push(right);
                    Ok(Value::Array(items))
                }
                _ => Err(not_a_list()),
            },
            "addAll" => match (current, right) {
                (Value::Array(mut items), Value::Array(more)) => {
                    items.extend(more);
                    Ok(Value::Array(items))
                }
                (Value::Array(_), _) => Err(FlowError::operation(format!(
                    "{}: addAll needs a list argument",
                    left
                ))),
                _ => Err(not_a_list()),
            },
            "remove" => match current {
                Value::Array(mut items) => {
                    if let Some(pos) = items.iter().position(|item| *item == right) {
                        items.remove(pos);
                    }
                    Ok(Value::Array(items))
                }
                _ => Err(not_a_list()),
            },
            other => Err(FlowError::operation(format!(
                "{}: unsupported method '{}'",
                left, other
            ))),
        }
    }

    fn should_persist_on_null(&self) -> bool {
        false
    }
}

/// Replaces the node at a slash-separated path inside a structured value
///
/// Missing intermediate objects are created. Numeric segments index into
/// existing lists.
pub struct XPathUpdateStrategy;

impl XPathUpdateStrategy {
    fn set_at(
        target: &mut Value,
        segments: &[&str],
        right: Value,
    ) -> std::result::Result<(), String> {
        let Some((head, rest)) = segments.split_first() else {
            *target = right;
            return Ok(());
        };

        if target.is_null() {
            *target = Value::Object(Map::new());
        }
        let child = match target {
            Value::Object(map) => map.entry(head.to_string()).or_insert(Value::Null),
            Value::Array(items) => {
                let index: usize = head
                    .parse()
                    .map_err(|_| format!("'{}' is not a list index", head))?;
                let len = items.len();
                items
                    .get_mut(index)
                    .ok_or_else(|| format!("index {} out of bounds ({} items)", index, len))?
            }
            _ => return Err(format!("cannot descend into a scalar at '{}'", head)),
        };
        Self::set_at(child, rest, right)
    }
}

impl OperationExecutorStrategy for XPathUpdateStrategy {
    fn compute_new_value(
        &self,
        operation: &Operation,
        right: Value,
        context: &ExecutionContext,
    ) -> Result<Value> {
        let path = required_operator(operation)?;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut value = current_value(operation, context);

        Self::set_at(&mut value, &segments, right).map_err(|reason| {
            FlowError::operation(format!(
                "{}: cannot update path '{}': {}",
                operation.left_operand(),
                path,
                reason
            ))
        })?;
        Ok(value)
    }

    fn should_persist_on_null(&self) -> bool {
        false
    }
}

/// Appends the right value to the current list, creating it when absent
pub struct RecordInListStrategy;

impl OperationExecutorStrategy for RecordInListStrategy {
    fn compute_new_value(
        &self,
        operation: &Operation,
        right: Value,
        context: &ExecutionContext,
    ) -> Result<Value> {
        match current_value(operation, context) {
            Value::Null => Ok(Value::Array(vec![right])),
            Value::Array(mut items) => {
                items.push(right);
                Ok(Value::Array(items))
            }
            _ => Err(FlowError::operation(format!(
                "{} is not a list",
                operation.left_operand()
            ))),
        }
    }

    fn should_persist_on_null(&self) -> bool {
        false
    }
}

pub struct DeletionStrategy;

impl OperationExecutorStrategy for DeletionStrategy {
    fn compute_new_value(
        &self,
        _operation: &Operation,
        _right: Value,
        _context: &ExecutionContext,
    ) -> Result<Value> {
        Ok(Value::Null)
    }

    fn should_persist_on_null(&self) -> bool {
        true
    }

    fn is_deletion(&self) -> bool {
        true
    }
}
