//! Expression evaluation contract
//!
//! The expression language itself lives outside the core. The engine only
//! needs something that turns an [`Expression`] into a value.

use crate::errors::{FlowError, Result};
use crate::operation::context::{EvaluatedValue, ExecutionContext};
use crate::operation::model::{Expression, ExpressionKind};
use serde_json::Value;

pub trait ExpressionEvaluator: Send + Sync {
    /// # Errors
    ///
    /// `ExpressionEvaluation` when the expression cannot be evaluated.
    fn evaluate(&self, expression: &Expression, context: &ExecutionContext)
        -> Result<EvaluatedValue>;
}

/// Evaluator for the expression kinds that need no interpreter
///
/// - `CONSTANT`: `content` is a JSON literal; a `string` return type takes the
///   content verbatim.
/// - `VARIABLE` / `CONTRACT_INPUT`: `content` names a value of the context.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicExpressionEvaluator;

impl ExpressionEvaluator for BasicExpressionEvaluator {
    fn evaluate(
        &self,
        expression: &Expression,
        context: &ExecutionContext,
    ) -> Result<EvaluatedValue> {
        let failed = |reason: String| FlowError::ExpressionEvaluation {
            expression: expression.name.clone(),
            reason,
        };

        match expression.kind {
            ExpressionKind::Constant => {
                if expression.return_type.eq_ignore_ascii_case("string") {
                    return Ok(Value::String(expression.content.clone()).into());
                }
                serde_json::from_str::<Value>(&expression.content)
                    .map(EvaluatedValue::Data)
                    .map_err(|e| failed(format!("not a JSON literal: {}", e)))
            }
            ExpressionKind::Variable | ExpressionKind::ContractInput => context
                .get(&expression.content)
                .cloned()
                .map(EvaluatedValue::Data)
                .ok_or_else(|| failed(format!("'{}' is not defined", expression.content))),
            ExpressionKind::Script => Err(failed(
                "script expressions need an interpreter".to_string(),
            )),
        }
    }
}
