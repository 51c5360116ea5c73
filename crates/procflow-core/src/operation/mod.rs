//! Operation execution
//!
//! Ordered batches of variable mutations applied to the data stores behind
//! pluggable left operand handlers.

pub mod context;
pub mod engine;
pub mod evaluator;
pub mod handler;
pub mod handlers;
pub mod model;
pub mod services;
pub mod strategy;

pub use context::{ContainerType, EvaluatedValue, ExecutionContext};
pub use engine::{LeftOperandUpdateStatus, OperationExecutionEngine, UpdateDecisions};
pub use evaluator::{BasicExpressionEvaluator, ExpressionEvaluator};
pub use handler::{LeftOperandHandler, LeftOperandHandlerRegistry};
pub use model::{Expression, ExpressionKind, LeftOperand, LeftOperandType, Operation, OperatorType};
pub use services::{BusinessDataService, DataInstanceService, DocumentService, TransientDataService};
