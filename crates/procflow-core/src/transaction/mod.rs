//! Transaction boundary
//!
//! `TransactionService` wraps an external [`TransactionManager`] with one
//! active scope per [`TransactionContext`], before-commit callables and
//! completion synchronizations. The context is passed explicitly to every
//! call; the manager is addressed through the context's association id.

pub mod context;
pub mod lock;
pub mod manager;
pub mod memory;
pub mod service;
pub mod state;

pub use context::{BeforeCommitCallable, TransactionContext};
pub use lock::{LockHandle, LockService};
pub use manager::{
    ManagerError, NativeSynchronization, StatusCode, TransactionHandle, TransactionManager,
};
pub use memory::InMemoryTransactionManager;
pub use service::TransactionService;
pub use state::{TransactionState, TransactionSynchronization};
