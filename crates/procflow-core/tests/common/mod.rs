#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use procflow_core::core_types::AssociationId;
use procflow_core::errors::{FlowError, Result};
use procflow_core::flownode::model::{FlowNodeInstance, FlowNodeKind, Session, User};
use procflow_core::operation::handlers::{
    BusinessDataLeftOperandHandler, DataLeftOperandHandler, DocumentLeftOperandHandler,
    DocumentListLeftOperandHandler, ExternalDataLeftOperandHandler,
    TransientDataLeftOperandHandler,
};
use procflow_core::operation::{
    BasicExpressionEvaluator, ContainerType, EvaluatedValue, ExecutionContext, Expression,
    ExpressionEvaluator, ExpressionKind, LeftOperand, LeftOperandHandler,
    LeftOperandHandlerRegistry, LeftOperandType, OperationExecutionEngine,
};
use procflow_core::transaction::{
    InMemoryTransactionManager, ManagerError, NativeSynchronization, StatusCode,
    TransactionHandle, TransactionManager,
};
use procflow_core::{InMemoryProcessStore, ServiceAccessor};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Transaction manager with failure injection
// ---------------------------------------------------------------------------

/// Wraps the in-memory manager, records calls and injects failures
#[derive(Default)]
pub struct RecordingTransactionManager {
    inner: InMemoryTransactionManager,
    calls: Mutex<Vec<String>>,
    forced_status: Mutex<Option<StatusCode>>,
    pub fail_begin: AtomicBool,
    pub fail_commit: AtomicBool,
    pub fail_rollback: AtomicBool,
    pub fail_register: AtomicBool,
}

impl RecordingTransactionManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Report `status` until the next rollback
    pub fn force_status(&self, status: StatusCode) {
        *self.forced_status.lock().unwrap() = Some(status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn open_transactions(&self) -> usize {
        self.inner.open_transactions()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

impl TransactionManager for RecordingTransactionManager {
    fn begin(&self, association: &AssociationId) -> std::result::Result<(), ManagerError> {
        self.record("begin");
        if self.fail_begin.load(Ordering::SeqCst) {
            return Err(ManagerError::System("begin refused".to_string()));
        }
        self.inner.begin(association)
    }

    fn commit(&self, association: &AssociationId) -> std::result::Result<(), ManagerError> {
        self.record("commit");
        if self.fail_commit.load(Ordering::SeqCst) {
            let _ = self.inner.rollback(association);
            return Err(ManagerError::Heuristic("commit refused".to_string()));
        }
        self.inner.commit(association)
    }

    fn rollback(&self, association: &AssociationId) -> std::result::Result<(), ManagerError> {
        self.record("rollback");
        if self.fail_rollback.load(Ordering::SeqCst) {
            return Err(ManagerError::System("rollback refused".to_string()));
        }
        if self.forced_status.lock().unwrap().take().is_some() {
            let _ = self.inner.rollback(association);
            return Ok(());
        }
        self.inner.rollback(association)
    }

    fn status(&self, association: &AssociationId) -> std::result::Result<StatusCode, ManagerError> {
        if let Some(status) = *self.forced_status.lock().unwrap() {
            return Ok(status);
        }
        self.inner.status(association)
    }

    fn transaction(
        &self,
        association: &AssociationId,
    ) -> std::result::Result<Option<TransactionHandle>, ManagerError> {
        self.inner.transaction(association)
    }

    fn set_rollback_only(
        &self,
        association: &AssociationId,
    ) -> std::result::Result<(), ManagerError> {
        self.record("set_rollback_only");
        self.inner.set_rollback_only(association)
    }

    fn register_synchronization(
        &self,
        transaction: &TransactionHandle,
        synchronization: Box<dyn NativeSynchronization>,
    ) -> std::result::Result<(), ManagerError> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(ManagerError::IllegalState("registration refused".to_string()));
        }
        self.inner.register_synchronization(transaction, synchronization)
    }
}

// ---------------------------------------------------------------------------
// Handlers and evaluators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerCall {
    Load(Vec<String>),
    Update(String, Value),
    Delete(String),
}

/// Handler that stores nothing and records every call
pub struct RecordingHandler {
    handler_type: LeftOperandType,
    supports_delete: bool,
    stored: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<HandlerCall>>,
}

impl RecordingHandler {
    pub fn new(handler_type: LeftOperandType) -> Arc<Self> {
        Arc::new(Self {
            handler_type,
            supports_delete: true,
            stored: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn without_delete(handler_type: LeftOperandType) -> Arc<Self> {
        Arc::new(Self {
            handler_type,
            supports_delete: false,
            stored: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Value the loader returns for `name`
    pub fn seed(&self, name: &str, value: Value) {
        self.stored.lock().unwrap().insert(name.to_string(), value);
    }

    pub fn calls(&self) -> Vec<HandlerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<HandlerCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, HandlerCall::Load(_)))
            .collect()
    }
}

impl LeftOperandHandler for RecordingHandler {
    fn handler_type(&self) -> LeftOperandType {
        self.handler_type
    }

    fn update(
        &self,
        left_operand: &LeftOperand,
        _input_values: &HashMap<String, Value>,
        new_value: &Value,
        _container_id: i64,
        _container_type: ContainerType,
    ) -> Result<Value> {
        self.calls.lock().unwrap().push(HandlerCall::Update(
            left_operand.name().to_string(),
            new_value.clone(),
        ));
        Ok(new_value.clone())
    }

    fn delete(
        &self,
        left_operand: &LeftOperand,
        _container_id: i64,
        _container_type: ContainerType,
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(HandlerCall::Delete(left_operand.name().to_string()));
        if !self.supports_delete {
            return Err(FlowError::operation("delete not supported"));
        }
        Ok(())
    }

    fn load_left_operand_in_context(
        &self,
        left_operand: &LeftOperand,
        container_id: i64,
        container_type: ContainerType,
        context: &mut ExecutionContext,
    ) -> Result<()> {
        self.load_left_operands_in_context(
            std::slice::from_ref(left_operand),
            container_id,
            container_type,
            context,
        )
    }

    fn load_left_operands_in_context(
        &self,
        left_operands: &[LeftOperand],
        _container_id: i64,
        _container_type: ContainerType,
        context: &mut ExecutionContext,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(HandlerCall::Load(
            left_operands.iter().map(|l| l.name().to_string()).collect(),
        ));
        let stored = self.stored.lock().unwrap();
        for left in left_operands {
            if let Some(value) = stored.get(left.name()) {
                context.put_if_absent(left.name(), value.clone());
            }
        }
        Ok(())
    }
}

/// Basic evaluator that counts calls; `SCRIPT` expressions yield an opaque
/// value named by their content
#[derive(Default)]
pub struct CountingEvaluator {
    pub calls: AtomicUsize,
}

impl ExpressionEvaluator for CountingEvaluator {
    fn evaluate(
        &self,
        expression: &Expression,
        context: &ExecutionContext,
    ) -> Result<EvaluatedValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if expression.kind == ExpressionKind::Script {
            return Ok(EvaluatedValue::Opaque(expression.content.clone()));
        }
        BasicExpressionEvaluator.evaluate(expression, context)
    }
}

pub fn script(content: &str) -> Expression {
    Expression::new("script", content, ExpressionKind::Script, "object")
}

pub fn engine_with(
    evaluator: Arc<dyn ExpressionEvaluator>,
    handlers: Vec<Arc<dyn LeftOperandHandler>>,
) -> OperationExecutionEngine {
    OperationExecutionEngine::new(evaluator, Arc::new(LeftOperandHandlerRegistry::new(handlers)))
}

// ---------------------------------------------------------------------------
// Process store wiring
// ---------------------------------------------------------------------------

pub const PROCESS_ID: i64 = 1;

pub fn store_handlers(store: &Arc<InMemoryProcessStore>) -> Vec<Arc<dyn LeftOperandHandler>> {
    vec![
        Arc::new(DataLeftOperandHandler::new(store.clone())),
        Arc::new(TransientDataLeftOperandHandler::new(store.clone())),
        Arc::new(BusinessDataLeftOperandHandler::new(store.clone())),
        Arc::new(DocumentLeftOperandHandler::new(store.clone())),
        Arc::new(DocumentListLeftOperandHandler::new(store.clone())),
        Arc::new(ExternalDataLeftOperandHandler),
    ]
}

pub fn services(store: &Arc<InMemoryProcessStore>) -> ServiceAccessor {
    let engine = engine_with(Arc::new(BasicExpressionEvaluator), store_handlers(store));
    ServiceAccessor {
        flow_nodes: store.clone(),
        gateways: store.clone(),
        activities: store.clone(),
        identity: store.clone(),
        comments: store.clone(),
        contract_data: store.clone(),
        executor: store.clone(),
        operations: Arc::new(engine),
    }
}

pub fn session(user_id: i64, user_name: &str) -> Session {
    Session {
        user_id,
        user_name: user_name.to_string(),
        tenant_id: 1,
    }
}

pub fn user(id: i64, user_name: &str) -> User {
    User {
        id,
        user_name: user_name.to_string(),
    }
}

pub fn task(id: i64, name: &str) -> FlowNodeInstance {
    FlowNodeInstance::new(id, name, FlowNodeKind::UserTask, PROCESS_ID)
}
