//! Contract of the underlying (two-phase-commit capable) transaction manager

use procflow_core_types::AssociationId;
use thiserror::Error;

/// Native status code reported by the manager
///
/// Values follow the conventional XA/JTA numbering so that adapters for real
/// managers can pass codes through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const ACTIVE: StatusCode = StatusCode(0);
    pub const MARKED_ROLLBACK: StatusCode = StatusCode(1);
    pub const PREPARED: StatusCode = StatusCode(2);
    pub const COMMITTED: StatusCode = StatusCode(3);
    pub const ROLLEDBACK: StatusCode = StatusCode(4);
    pub const UNKNOWN: StatusCode = StatusCode(5);
    pub const NO_TRANSACTION: StatusCode = StatusCode(6);
    pub const PREPARING: StatusCode = StatusCode(7);
    pub const COMMITTING: StatusCode = StatusCode(8);
    pub const ROLLING_BACK: StatusCode = StatusCode(9);
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            StatusCode::ACTIVE => "ACTIVE",
            StatusCode::MARKED_ROLLBACK => "MARKED_ROLLBACK",
            StatusCode::PREPARED => "PREPARED",
            StatusCode::COMMITTED => "COMMITTED",
            StatusCode::ROLLEDBACK => "ROLLEDBACK",
            StatusCode::UNKNOWN => "UNKNOWN",
            StatusCode::NO_TRANSACTION => "NO_TRANSACTION",
            StatusCode::PREPARING => "PREPARING",
            StatusCode::COMMITTING => "COMMITTING",
            StatusCode::ROLLING_BACK => "ROLLING_BACK",
            StatusCode(other) => return write!(f, "STATUS({})", other),
        };
        f.write_str(name)
    }
}

/// Failures reported by the transaction manager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    #[error("system failure: {0}")]
    System(String),

    /// Commit could not complete and the transaction was rolled back instead
    #[error("transaction rolled back: {0}")]
    RolledBack(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("heuristic outcome: {0}")]
    Heuristic(String),

    /// A registered synchronization failed during completion
    #[error("synchronization failed: {0}")]
    Synchronization(String),
}

/// Opaque handle on the transaction bound to an association
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionHandle {
    pub id: u64,
    pub association: AssociationId,
}

/// Manager-level completion callback
///
/// The manager calls `before_completion` right before a commit (never before
/// a rollback) and `after_completion` once the transaction has reached a
/// terminal state, with the final native status.
pub trait NativeSynchronization: Send + Sync {
    /// # Errors
    ///
    /// An error here makes the manager roll the transaction back.
    fn before_completion(&self) -> Result<(), ManagerError>;

    /// # Errors
    ///
    /// The transaction outcome is already fixed; the error is reported to the
    /// caller of `commit`/`rollback`.
    fn after_completion(&self, status: StatusCode) -> Result<(), ManagerError>;
}

/// Underlying transaction manager
///
/// Every call names the association (execution context) it applies to.
pub trait TransactionManager: Send + Sync {
    /// # Errors
    ///
    /// `IllegalState` when the association already has a transaction.
    fn begin(&self, association: &AssociationId) -> Result<(), ManagerError>;

    /// # Errors
    ///
    /// `RolledBack` when the transaction was marked rollback-only or a
    /// `before_completion` hook failed; `Synchronization` when an
    /// `after_completion` hook failed after the commit.
    fn commit(&self, association: &AssociationId) -> Result<(), ManagerError>;

    /// # Errors
    ///
    /// `IllegalState` without a transaction.
    fn rollback(&self, association: &AssociationId) -> Result<(), ManagerError>;

    /// # Errors
    ///
    /// `System` when the status cannot be determined.
    fn status(&self, association: &AssociationId) -> Result<StatusCode, ManagerError>;

    /// # Errors
    ///
    /// `System` when the lookup itself fails.
    fn transaction(
        &self,
        association: &AssociationId,
    ) -> Result<Option<TransactionHandle>, ManagerError>;

    /// # Errors
    ///
    /// `IllegalState` without a transaction.
    fn set_rollback_only(&self, association: &AssociationId) -> Result<(), ManagerError>;

    /// # Errors
    ///
    /// `IllegalState` when the handle no longer designates a live transaction.
    fn register_synchronization(
        &self,
        transaction: &TransactionHandle,
        synchronization: Box<dyn NativeSynchronization>,
    ) -> Result<(), ManagerError>;
}
