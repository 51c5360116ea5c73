use procflow_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias using FlowError
pub type Result<T> = std::result::Result<T, FlowError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used by the public API, the logging
/// facility (`err.code`) and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Transaction boundary
    TransactionCreation,
    TransactionCommit,
    TransactionRollback,
    TransactionNotFound,
    Transaction,

    // Operations
    OperationExecution,
    ExpressionEvaluation,

    // Flow nodes and tasks
    TaskVisibility,
    InvalidStateTransition,
    NotFound,
    Lock,

    // Integration
    Persistence,
    InvalidInput,
    Configuration,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::TransactionCreation => "ERR_TRANSACTION_CREATION",
            ExErrorKind::TransactionCommit => "ERR_TRANSACTION_COMMIT",
            ExErrorKind::TransactionRollback => "ERR_TRANSACTION_ROLLBACK",
            ExErrorKind::TransactionNotFound => "ERR_TRANSACTION_NOT_FOUND",
            ExErrorKind::Transaction => "ERR_TRANSACTION",
            ExErrorKind::OperationExecution => "ERR_OPERATION_EXECUTION",
            ExErrorKind::ExpressionEvaluation => "ERR_EXPRESSION_EVALUATION",
            ExErrorKind::TaskVisibility => "ERR_TASK_VISIBILITY",
            ExErrorKind::InvalidStateTransition => "ERR_INVALID_STATE_TRANSITION",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Lock => "ERR_LOCK",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// This is the shape errors take once they leave the core: the public API
/// returns it and `log_op_error!` reads its kind and code.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (flow node, task, left operand...)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy of the transactional runtime core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    // ===== Transaction boundary =====
    /// A transaction could not be opened (nested scope, unrecoverable manager state)
    #[error("Unable to create transaction: {reason}")]
    TransactionCreation { reason: String },

    /// Commit failed, or a before-commit callable failed
    #[error("Unable to commit transaction: {reason}")]
    TransactionCommit {
        reason: String,
        #[source]
        cause: Option<Box<FlowError>>,
    },

    /// Rollback failed
    #[error("Unable to roll back transaction: {reason}")]
    TransactionRollback { reason: String },

    /// A hook or callable was registered while no transaction is active
    #[error("No active transaction for {op}")]
    TransactionNotFound { op: String },

    /// Generic transaction manager failure
    #[error("Transaction error: {reason}")]
    Transaction { reason: String },

    /// The manager reported a status code with no named state
    #[error("Unmapped transaction status code: {code}")]
    UnmappedTransactionStatus { code: i32 },

    // ===== Operations =====
    /// An operation batch could not be executed
    #[error("Operation execution failed: {reason}")]
    OperationExecution {
        reason: String,
        #[source]
        cause: Option<Box<FlowError>>,
    },

    /// The expression evaluator rejected an expression
    #[error("Unable to evaluate expression '{expression}': {reason}")]
    ExpressionEvaluation { expression: String, reason: String },

    // ===== Flow nodes and tasks =====
    /// A task is already hidden for the user
    #[error("Task {task_id} is already hidden for user {user_id}")]
    TaskVisibility { task_id: i64, user_id: i64 },

    #[error("Flow node instance not found: {flow_node_id}")]
    FlowNodeNotFound { flow_node_id: i64 },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    /// State categories only move away from NORMAL
    #[error("Flow node {flow_node_id} cannot move from {from} to {to}")]
    InvalidStateTransition {
        flow_node_id: i64,
        from: String,
        to: String,
    },

    #[error("Unable to lock {object_type} {object_id}: {reason}")]
    Lock {
        object_id: i64,
        object_type: String,
        reason: String,
    },

    // ===== Integration =====
    /// A collaborator store failed
    #[error("Persistence failure in {op}: {message}")]
    Persistence { op: String, message: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    /// Panic or otherwise unclassified failure
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl FlowError {
    /// Wrap a failure into `OperationExecution`, leaving existing ones untouched
    pub fn into_operation_execution(self, reason: impl Into<String>) -> FlowError {
        match self {
            err @ FlowError::OperationExecution { .. } => err,
            other => FlowError::OperationExecution {
                reason: reason.into(),
                cause: Some(Box::new(other)),
            },
        }
    }

    /// Build an `OperationExecution` error without an underlying cause
    pub fn operation(reason: impl Into<String>) -> FlowError {
        FlowError::OperationExecution {
            reason: reason.into(),
            cause: None,
        }
    }
}

impl From<FlowError> for ExError {
    fn from(err: FlowError) -> Self {
        let message = err.to_string();
        match err {
            FlowError::TransactionCreation { .. } => {
                ExError::new(ExErrorKind::TransactionCreation).with_message(message)
            }
            FlowError::TransactionCommit { cause, .. } => {
                let ex = ExError::new(ExErrorKind::TransactionCommit).with_message(message);
                match cause {
                    Some(cause) => ex.with_source(ExError::from(*cause)),
                    None => ex,
                }
            }
            FlowError::TransactionRollback { .. } => {
                ExError::new(ExErrorKind::TransactionRollback).with_message(message)
            }
            FlowError::TransactionNotFound { op } => {
                ExError::new(ExErrorKind::TransactionNotFound)
                    .with_op(op)
                    .with_message(message)
            }
            FlowError::Transaction { .. } | FlowError::UnmappedTransactionStatus { .. } => {
                ExError::new(ExErrorKind::Transaction).with_message(message)
            }
            FlowError::OperationExecution { cause, .. } => {
                let ex = ExError::new(ExErrorKind::OperationExecution).with_message(message);
                match cause {
                    Some(cause) => ex.with_source(ExError::from(*cause)),
                    None => ex,
                }
            }
            FlowError::ExpressionEvaluation { expression, .. } => {
                ExError::new(ExErrorKind::ExpressionEvaluation)
                    .with_entity_id(expression)
                    .with_message(message)
            }
            FlowError::TaskVisibility { task_id, .. } => {
                ExError::new(ExErrorKind::TaskVisibility)
                    .with_entity_id(task_id.to_string())
                    .with_message(message)
            }
            FlowError::FlowNodeNotFound { flow_node_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(flow_node_id.to_string())
                .with_message(message),
            FlowError::UserNotFound { user_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(user_id.to_string())
                .with_message(message),
            FlowError::InvalidStateTransition { flow_node_id, .. } => {
                ExError::new(ExErrorKind::InvalidStateTransition)
                    .with_entity_id(flow_node_id.to_string())
                    .with_message(message)
            }
            FlowError::Lock { object_id, .. } => ExError::new(ExErrorKind::Lock)
                .with_entity_id(object_id.to_string())
                .with_message(message),
            FlowError::Persistence { op, .. } => ExError::new(ExErrorKind::Persistence)
                .with_op(op)
                .with_message(message),
            FlowError::InvalidInput { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            FlowError::Configuration { .. } => {
                ExError::new(ExErrorKind::Configuration).with_message(message)
            }
            FlowError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::InvalidInput {
            reason: err.to_string(),
        }
    }
}
