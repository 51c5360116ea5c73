//! Named transaction states and domain-level synchronizations

use crate::errors::{FlowError, Result};
use crate::transaction::manager::{ManagerError, NativeSynchronization, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    Active,
    Committed,
    RollbackOnly,
    RolledBack,
    NoTransaction,
}

impl TransactionState {
    /// Map a native status code to its named state
    ///
    /// # Errors
    ///
    /// Transitional codes (PREPARING, COMMITTING...) and unknown codes have
    /// no named state and yield `UnmappedTransactionStatus`.
    pub fn from_status(status: StatusCode) -> Result<Self> {
        match status {
            StatusCode::ACTIVE => Ok(TransactionState::Active),
            StatusCode::COMMITTED => Ok(TransactionState::Committed),
            StatusCode::MARKED_ROLLBACK => Ok(TransactionState::RollbackOnly),
            StatusCode::ROLLEDBACK => Ok(TransactionState::RolledBack),
            StatusCode::NO_TRANSACTION => Ok(TransactionState::NoTransaction),
            StatusCode(code) => Err(FlowError::UnmappedTransactionStatus { code }),
        }
    }
}

/// Hooks run by the boundary around the completion of a transaction
pub trait TransactionSynchronization: Send + Sync {
    /// Runs before the underlying commit; an error rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Any error aborts the commit.
    fn before_commit(&self) -> Result<()>;

    /// Runs once the transaction reached `state`.
    ///
    /// # Errors
    ///
    /// Errors are logged and reported to the caller of `complete`.
    fn after_completion(&self, state: TransactionState) -> Result<()>;
}

/// Exposes a domain synchronization through the manager's native callback
pub(crate) struct SynchronizationAdapter {
    inner: Arc<dyn TransactionSynchronization>,
}

impl SynchronizationAdapter {
    pub(crate) fn new(inner: Arc<dyn TransactionSynchronization>) -> Self {
        Self { inner }
    }
}

impl NativeSynchronization for SynchronizationAdapter {
    fn before_completion(&self) -> std::result::Result<(), ManagerError> {
        self.inner
            .before_commit()
            .map_err(|e| ManagerError::Synchronization(e.to_string()))
    }

    fn after_completion(&self, status: StatusCode) -> std::result::Result<(), ManagerError> {
        let state = TransactionState::from_status(status).map_err(|e| {
            tracing::error!(status = %status, error = %e, "unmapped completion status");
            ManagerError::Synchronization(e.to_string())
        })?;
        self.inner.after_completion(state).map_err(|e| {
            tracing::error!(state = ?state, error = %e, "after_completion hook failed");
            ManagerError::Synchronization(e.to_string())
        })
    }
}
