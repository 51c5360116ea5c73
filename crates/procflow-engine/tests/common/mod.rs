#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use procflow_core::core_types::AssociationId;
use procflow_core::flownode::model::{FlowNodeInstance, FlowNodeKind, Session, User};
use procflow_core::transaction::{
    InMemoryTransactionManager, ManagerError, NativeSynchronization, StatusCode,
    TransactionHandle, TransactionManager,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const PROCESS_ID: i64 = 1;

/// In-memory manager counting how transactions end
#[derive(Default)]
pub struct CountingTransactionManager {
    inner: InMemoryTransactionManager,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
}

impl CountingTransactionManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn open_transactions(&self) -> usize {
        self.inner.open_transactions()
    }
}

impl TransactionManager for CountingTransactionManager {
    fn begin(&self, association: &AssociationId) -> Result<(), ManagerError> {
        self.inner.begin(association)
    }

    fn commit(&self, association: &AssociationId) -> Result<(), ManagerError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(association)
    }

    fn rollback(&self, association: &AssociationId) -> Result<(), ManagerError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.inner.rollback(association)
    }

    fn status(&self, association: &AssociationId) -> Result<StatusCode, ManagerError> {
        self.inner.status(association)
    }

    fn transaction(
        &self,
        association: &AssociationId,
    ) -> Result<Option<TransactionHandle>, ManagerError> {
        self.inner.transaction(association)
    }

    fn set_rollback_only(&self, association: &AssociationId) -> Result<(), ManagerError> {
        self.inner.set_rollback_only(association)
    }

    fn register_synchronization(
        &self,
        transaction: &TransactionHandle,
        synchronization: Box<dyn NativeSynchronization>,
    ) -> Result<(), ManagerError> {
        self.inner.register_synchronization(transaction, synchronization)
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
