//! Transaction boundary service
//!
//! ## Contract
//!
//! - One scope per [`TransactionContext`]: a second `begin` before `complete`
//!   fails and never reaches the manager.
//! - A transaction already active on the association when `begin` runs is
//!   *externally managed*: the boundary joins it, never ends it, and refuses
//!   before-commit callables on it.
//! - `complete` always leaves the context reset, whatever the outcome.
//! - The active-transaction counter moves once per underlying `begin` and once
//!   per underlying completion.

use crate::config::TransactionConfig;
use crate::errors::{FlowError, Result};
use crate::transaction::context::TransactionContext;
use crate::transaction::lock::LockService;
use crate::transaction::manager::{
    ManagerError, NativeSynchronization, StatusCode, TransactionManager,
};
use crate::transaction::state::{SynchronizationAdapter, TransactionSynchronization};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Decrements the shared counter when the underlying transaction ends
struct ActiveTransactionCounter {
    active: Arc<AtomicUsize>,
}

impl NativeSynchronization for ActiveTransactionCounter {
    fn before_completion(&self) -> std::result::Result<(), ManagerError> {
        Ok(())
    }

    fn after_completion(&self, _status: StatusCode) -> std::result::Result<(), ManagerError> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct TransactionService {
    manager: Arc<dyn TransactionManager>,
    active: Arc<AtomicUsize>,
    config: TransactionConfig,
}

impl TransactionService {
    pub fn new(manager: Arc<dyn TransactionManager>) -> Self {
        Self::with_config(manager, TransactionConfig::default())
    }

    pub fn with_config(manager: Arc<dyn TransactionManager>, config: TransactionConfig) -> Self {
        Self {
            manager,
            active: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }

    /// Open a transaction scope on `ctx`
    ///
    /// # Errors
    ///
    /// - `TransactionCreation` when `ctx` is already in scope, when the
    ///   manager cannot start a transaction, or when a transaction left in an
    ///   inconsistent state cannot be rolled back.
    pub fn begin(&self, ctx: &mut TransactionContext) -> Result<()> {
        if ctx.in_scope {
            // the open scope belongs to the caller; leave it untouched
            return Err(FlowError::TransactionCreation {
                reason: Self::nested_reason(ctx),
            });
        }

        self.begin_scope(ctx).inspect_err(|_| ctx.reset())
    }

    fn nested_reason(ctx: &TransactionContext) -> String {
        match &ctx.begun_at {
            Some(trace) if trace.status() == BacktraceStatus::Captured => format!(
                "nested transactions are not supported; the active one was opened at:\n{}",
                trace
            ),
            _ => "nested transactions are not supported; a transaction is already active on this context"
                .to_string(),
        }
    }

    fn begin_scope(&self, ctx: &mut TransactionContext) -> Result<()> {
        let association = ctx.association().clone();
        let mut status = self
            .manager
            .status(&association)
            .map_err(|e| FlowError::TransactionCreation {
                reason: format!("cannot read transaction status: {}", e),
            })?;

        if status != StatusCode::ACTIVE && status != StatusCode::NO_TRANSACTION {
            tracing::warn!(
                association_id = %association,
                status = %status,
                "transaction left in an inconsistent state, forcing rollback"
            );
            self.manager
                .rollback(&association)
                .map_err(|e| FlowError::TransactionCreation {
                    reason: format!(
                        "transaction in state {} could not be rolled back ({}); restart the server",
                        status, e
                    ),
                })?;
            status = StatusCode::NO_TRANSACTION;
        }

        ctx.in_scope = true;
        ctx.externally_managed = status == StatusCode::ACTIVE;
        if self.config.trace_begin {
            ctx.begun_at = Some(Backtrace::force_capture());
        }

        if ctx.externally_managed {
            tracing::debug!(
                association_id = %association,
                "joining externally managed transaction"
            );
            return Ok(());
        }

        self.manager
            .begin(&association)
            .map_err(|e| FlowError::TransactionCreation {
                reason: e.to_string(),
            })?;

        if let Err(e) = self.register_counter(ctx) {
            if let Err(rollback_err) = self.manager.rollback(&association) {
                tracing::error!(
                    association_id = %association,
                    error = %rollback_err,
                    "rollback after failed begin also failed"
                );
            }
            return Err(e);
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn register_counter(&self, ctx: &TransactionContext) -> Result<()> {
        let handle = self
            .manager
            .transaction(ctx.association())
            .map_err(|e| FlowError::TransactionCreation {
                reason: e.to_string(),
            })?
            .ok_or_else(|| FlowError::TransactionCreation {
                reason: "manager started no transaction".to_string(),
            })?;
        self.manager
            .register_synchronization(
                &handle,
                Box::new(ActiveTransactionCounter {
                    active: self.active.clone(),
                }),
            )
            .map_err(|e| FlowError::TransactionCreation {
                reason: format!("cannot register completion counter: {}", e),
            })
    }

    /// Close the scope opened by `begin`: commit, or roll back when marked
    ///
    /// # Errors
    ///
    /// - `TransactionCommit` when no transaction is active, a before-commit
    ///   callable failed (the transaction is then rolled back) or the commit
    ///   failed.
    /// - `TransactionRollback` when a rollback-only transaction could not be
    ///   rolled back.
    pub fn complete(&self, ctx: &mut TransactionContext) -> Result<()> {
        let result = self.complete_scope(ctx);
        ctx.reset();
        result
    }

    fn complete_scope(&self, ctx: &mut TransactionContext) -> Result<()> {
        if !ctx.in_scope {
            return Err(FlowError::TransactionCommit {
                reason: "no transaction scope is open on this context".to_string(),
                cause: None,
            });
        }

        let association = ctx.association().clone();
        let status = self
            .manager
            .status(&association)
            .map_err(|e| FlowError::TransactionCommit {
                reason: format!("cannot read transaction status: {}", e),
                cause: None,
            })?;

        if status == StatusCode::NO_TRANSACTION {
            return Err(FlowError::TransactionCommit {
                reason: "no transaction is active".to_string(),
                cause: None,
            });
        }

        if ctx.externally_managed {
            return Ok(());
        }

        if status == StatusCode::MARKED_ROLLBACK {
            tracing::debug!(
                association_id = %association,
                "rolling back transaction marked rollback-only"
            );
            return self
                .manager
                .rollback(&association)
                .map_err(|e| FlowError::TransactionRollback {
                    reason: e.to_string(),
                });
        }

        let mut failures = Vec::new();
        for callable in std::mem::take(&mut ctx.before_commit_callables) {
            if let Err(e) = callable() {
                failures.push(e);
            }
        }

        if !failures.is_empty() {
            tracing::warn!(
                association_id = %association,
                failed = failures.len(),
                "before-commit callables failed, transaction will roll back"
            );
            if let Err(e) = self.manager.set_rollback_only(&association) {
                tracing::error!(
                    association_id = %association,
                    error = %e,
                    "cannot mark transaction rollback-only"
                );
            }
        }

        // reach a terminal state even when a callable failed
        let committed = self.manager.commit(&association);

        if let Some(first) = failures.into_iter().next() {
            return Err(FlowError::TransactionCommit {
                reason: "a before-commit callable failed".to_string(),
                cause: Some(Box::new(first)),
            });
        }
        committed.map_err(|e| FlowError::TransactionCommit {
            reason: e.to_string(),
            cause: None,
        })
    }

    /// # Errors
    ///
    /// `Transaction` when the manager refuses the mark.
    pub fn set_rollback_only(&self, ctx: &TransactionContext) -> Result<()> {
        self.manager
            .set_rollback_only(ctx.association())
            .map_err(|e| FlowError::Transaction {
                reason: e.to_string(),
            })
    }

    /// # Errors
    ///
    /// `Transaction` when the status cannot be read.
    pub fn is_rollback_only(&self, ctx: &TransactionContext) -> Result<bool> {
        let status = self
            .manager
            .status(ctx.association())
            .map_err(|e| FlowError::Transaction {
                reason: e.to_string(),
            })?;
        Ok(status == StatusCode::MARKED_ROLLBACK)
    }

    /// Attach completion hooks to the transaction of `ctx`
    ///
    /// # Errors
    ///
    /// `TransactionNotFound` without a transaction, `Transaction` when the
    /// manager rejects the registration.
    pub fn register_synchronization(
        &self,
        ctx: &TransactionContext,
        synchronization: Arc<dyn TransactionSynchronization>,
    ) -> Result<()> {
        let handle = self
            .manager
            .transaction(ctx.association())
            .map_err(|e| FlowError::Transaction {
                reason: e.to_string(),
            })?
            .ok_or_else(|| FlowError::TransactionNotFound {
                op: "register_synchronization".to_string(),
            })?;
        self.manager
            .register_synchronization(
                &handle,
                Box::new(SynchronizationAdapter::new(synchronization)),
            )
            .map_err(|e| FlowError::Transaction {
                reason: e.to_string(),
            })
    }

    /// Queue work to run right before the underlying commit
    ///
    /// # Errors
    ///
    /// `TransactionNotFound` unless the association has an active transaction;
    /// `Transaction` when the scope joined an externally managed transaction,
    /// whose commit this boundary never drives.
    pub fn register_before_commit_callable<F>(
        &self,
        ctx: &mut TransactionContext,
        callable: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        let status = self
            .manager
            .status(ctx.association())
            .map_err(|e| FlowError::Transaction {
                reason: e.to_string(),
            })?;
        if status != StatusCode::ACTIVE {
            return Err(FlowError::TransactionNotFound {
                op: "register_before_commit_callable".to_string(),
            });
        }
        if ctx.externally_managed {
            return Err(FlowError::Transaction {
                reason: "before-commit callables cannot be queued on an externally managed transaction"
                    .to_string(),
            });
        }
        ctx.before_commit_callables.push(Box::new(callable));
        Ok(())
    }

    /// Run `work` inside its own transaction scope
    ///
    /// Errors (and panics, reported as `Internal`) mark the transaction
    /// rollback-only; the scope is completed in every case.
    ///
    /// # Errors
    ///
    /// The error of `begin`, of `work`, or of the final commit.
    pub fn execute_in_transaction<T, F>(&self, ctx: &mut TransactionContext, work: F) -> Result<T>
    where
        F: FnOnce(&mut TransactionContext) -> Result<T>,
    {
        self.begin(ctx)?;

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| work(ctx))) {
            Ok(outcome) => outcome,
            Err(payload) => Err(FlowError::Internal {
                message: panic_message(payload.as_ref()),
            }),
        };

        match outcome {
            Ok(value) => {
                self.complete(ctx)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(mark_err) = self.set_rollback_only(ctx) {
                    tracing::warn!(error = %mark_err, "cannot mark transaction rollback-only");
                }
                tracing::debug!(error = %err, "transactional work failed, rolling back");
                if let Err(complete_err) = self.complete(ctx) {
                    tracing::warn!(
                        error = %complete_err,
                        "completion after failed work also failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// Run `work` in a transaction while holding the lock on an object
    ///
    /// The lock is released once the transaction has completed. A failed
    /// release is only logged: the work already committed or rolled back.
    ///
    /// # Errors
    ///
    /// `Lock` when the lock cannot be taken, otherwise as
    /// `execute_in_transaction`.
    pub fn execute_locked<T, F>(
        &self,
        ctx: &mut TransactionContext,
        locks: &dyn LockService,
        object_id: i64,
        object_type: &str,
        work: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut TransactionContext) -> Result<T>,
    {
        let handle = locks.lock(object_id, object_type, ctx.association().as_str())?;
        let result = self.execute_in_transaction(ctx, work);
        if let Err(e) = locks.unlock(&handle) {
            tracing::error!(
                object_id,
                object_type,
                error = %e,
                "lock release failed after the transaction completed; a restart may be required"
            );
        }
        result
    }

    /// Underlying transactions begun by this service and not yet completed
    pub fn number_of_active_transactions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("transactional work panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("transactional work panicked: {}", s)
    } else {
        "transactional work panicked".to_string()
    }
}
