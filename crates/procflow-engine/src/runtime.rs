//! Runtime wiring

use procflow_core::commands::ServiceAccessor;
use procflow_core::config::EngineConfig;
use procflow_core::logging_facility;
use procflow_core::operation::handlers::{
    BusinessDataLeftOperandHandler, DataLeftOperandHandler, DocumentLeftOperandHandler,
    DocumentListLeftOperandHandler, ExternalDataLeftOperandHandler,
    TransientDataLeftOperandHandler,
};
use procflow_core::operation::{
    BasicExpressionEvaluator, ExpressionEvaluator, LeftOperandHandler, LeftOperandHandlerRegistry,
    OperationExecutionEngine,
};
use procflow_core::transaction::{InMemoryTransactionManager, LockService, TransactionManager};
use procflow_core::{InMemoryProcessStore, TransactionService};
use std::sync::Arc;

/// Everything a command needs: the boundary, the services and the locks
pub struct ProcessRuntime {
    config: EngineConfig,
    transactions: TransactionService,
    services: ServiceAccessor,
    locks: Arc<dyn LockService>,
}

impl ProcessRuntime {
    pub fn new(
        config: EngineConfig,
        manager: Arc<dyn TransactionManager>,
        services: ServiceAccessor,
        locks: Arc<dyn LockService>,
    ) -> Self {
        let transactions = TransactionService::with_config(manager, config.transaction.clone());
        Self {
            config,
            transactions,
            services,
            locks,
        }
    }

    /// Runtime over the in-memory manager and `store`
    ///
    /// Every left operand type is handled by `store`, expressions go through
    /// the basic evaluator and audit events follow `config.operations.audit`.
    pub fn in_memory(config: EngineConfig, store: Arc<InMemoryProcessStore>) -> Self {
        let handlers: Vec<Arc<dyn LeftOperandHandler>> = vec![
            Arc::new(DataLeftOperandHandler::new(store.clone())),
            Arc::new(TransientDataLeftOperandHandler::new(store.clone())),
            Arc::new(BusinessDataLeftOperandHandler::new(store.clone())),
            Arc::new(DocumentLeftOperandHandler::new(store.clone())),
            Arc::new(DocumentListLeftOperandHandler::new(store.clone())),
            Arc::new(ExternalDataLeftOperandHandler),
        ];
        let evaluator: Arc<dyn ExpressionEvaluator> = Arc::new(BasicExpressionEvaluator);
        let registry = Arc::new(LeftOperandHandlerRegistry::new(handlers));
        let operations =
            OperationExecutionEngine::new(evaluator, registry).with_audit(config.operations.audit);

        let services = ServiceAccessor {
            flow_nodes: store.clone(),
            gateways: store.clone(),
            activities: store.clone(),
            identity: store.clone(),
            comments: store.clone(),
            contract_data: store.clone(),
            executor: store.clone(),
            operations: Arc::new(operations),
        };
        Self::new(
            config,
            Arc::new(InMemoryTransactionManager::new()),
            services,
            store,
        )
    }

    /// Install the subscriber for the configured logging profile
    pub fn init_logging(&self) {
        logging_facility::init(self.config.logging.profile);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transactions(&self) -> &TransactionService {
        &self.transactions
    }

    pub fn services(&self) -> &ServiceAccessor {
        &self.services
    }

    pub fn locks(&self) -> &dyn LockService {
        self.locks.as_ref()
    }

    /// Transactions opened through this runtime and not completed yet
    pub fn active_transactions(&self) -> usize {
        self.transactions.number_of_active_transactions()
    }
}
