//! Transaction boundary tests
//!
//! ## Scenarios Covered
//!
//! 1. begin/complete commits and balances the active counter
//! 2. Nested begin fails without reaching the manager
//! 3. Externally managed transactions are joined, never ended, take no callables
//! 4. Inconsistent manager state is rolled back on begin
//! 5. Before-commit callables run in order; a failure rolls back
//! 6. Synchronizations observe the final state
//! 7. execute_in_transaction and execute_locked cleanup, unlock failure logged only
//! 8. Counter stays balanced across threads

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::RecordingTransactionManager;
use procflow_core::errors::{FlowError, Result};
use procflow_core::logging_facility::test_capture::init_test_capture;
use procflow_core::transaction::{
    LockHandle, LockService, StatusCode, TransactionContext, TransactionManager, TransactionService,
    TransactionState, TransactionSynchronization,
};
use procflow_core::InMemoryProcessStore;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

fn service() -> (TransactionService, Arc<RecordingTransactionManager>) {
    let manager = RecordingTransactionManager::new();
    (TransactionService::new(manager.clone()), manager)
}

#[test]
fn test_begin_then_complete_commits() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();

    svc.begin(&mut ctx).unwrap();
    assert!(ctx.is_in_scope());
    assert!(!ctx.is_externally_managed());
    svc.complete(&mut ctx).unwrap();

    assert_eq!(manager.calls(), vec!["begin", "commit"]);
    assert_eq!(svc.number_of_active_transactions(), 0);
    assert!(!ctx.is_in_scope());
}

#[test]
fn test_double_begin_fails_and_reaches_manager_once() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    svc.begin(&mut ctx).unwrap();

    let err = svc.begin(&mut ctx).unwrap_err();

    assert!(matches!(err, FlowError::TransactionCreation { .. }));
    assert_eq!(manager.count("begin"), 1);
    // the outer scope is still usable
    assert!(ctx.is_in_scope());
    svc.complete(&mut ctx).unwrap();
    assert_eq!(manager.count("commit"), 1);
}

#[test]
fn test_externally_managed_complete_never_ends_transaction() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    manager.begin(ctx.association()).unwrap();

    svc.begin(&mut ctx).unwrap();
    assert!(ctx.is_externally_managed());
    assert_eq!(svc.number_of_active_transactions(), 0);
    svc.complete(&mut ctx).unwrap();

    assert_eq!(manager.calls(), vec!["begin"]);
    assert_eq!(manager.status(ctx.association()).unwrap(), StatusCode::ACTIVE);
    assert!(!ctx.is_externally_managed());
}

#[test]
fn test_callable_refused_on_externally_managed_scope() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    manager.begin(ctx.association()).unwrap();
    svc.begin(&mut ctx).unwrap();
    let ran = Rc::new(RefCell::new(false));
    let flag = ran.clone();

    let err = svc
        .register_before_commit_callable(&mut ctx, move || {
            *flag.borrow_mut() = true;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, FlowError::Transaction { .. }));
    assert_eq!(ctx.pending_callables(), 0);
    svc.complete(&mut ctx).unwrap();
    manager.commit(ctx.association()).unwrap();
    assert!(!*ran.borrow());
    assert_eq!(manager.calls(), vec!["begin", "commit"]);
}

#[test]
fn test_inconsistent_status_is_rolled_back_before_begin() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    manager.force_status(StatusCode::COMMITTING);

    svc.begin(&mut ctx).unwrap();

    assert_eq!(manager.calls(), vec!["rollback", "begin"]);
    svc.complete(&mut ctx).unwrap();
}

#[test]
fn test_unrecoverable_status_asks_for_restart() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    manager.force_status(StatusCode::PREPARING);
    manager.fail_rollback.store(true, Ordering::SeqCst);

    let err = svc.begin(&mut ctx).unwrap_err();

    match err {
        FlowError::TransactionCreation { reason } => assert!(reason.contains("restart")),
        other => panic!("unexpected {:?}", other),
    }
    assert!(!ctx.is_in_scope());
    assert_eq!(manager.count("begin"), 0);
}

#[test]
fn test_manager_begin_failure_resets_context() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    manager.fail_begin.store(true, Ordering::SeqCst);

    let err = svc.begin(&mut ctx).unwrap_err();

    assert!(matches!(err, FlowError::TransactionCreation { .. }));
    assert!(!ctx.is_in_scope());
    assert_eq!(svc.number_of_active_transactions(), 0);
}

#[test]
fn test_counter_registration_failure_rolls_back_underlying_transaction() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    manager.fail_register.store(true, Ordering::SeqCst);

    assert!(svc.begin(&mut ctx).is_err());

    assert_eq!(manager.calls(), vec!["begin", "rollback"]);
    assert_eq!(manager.open_transactions(), 0);
    assert_eq!(svc.number_of_active_transactions(), 0);
}

#[test]
fn test_complete_with_no_transaction_is_commit_error() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    svc.begin(&mut ctx).unwrap();
    // the manager lost the transaction behind our back
    manager.rollback(ctx.association()).unwrap();

    let err = svc.complete(&mut ctx).unwrap_err();

    assert!(matches!(err, FlowError::TransactionCommit { .. }));
    assert!(!ctx.is_in_scope());
    assert_eq!(svc.number_of_active_transactions(), 0);
}

#[test]
fn test_rollback_only_transaction_is_rolled_back_on_complete() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    svc.begin(&mut ctx).unwrap();
    svc.set_rollback_only(&ctx).unwrap();

    svc.complete(&mut ctx).unwrap();

    assert_eq!(manager.calls(), vec!["begin", "set_rollback_only", "rollback"]);
    assert_eq!(svc.number_of_active_transactions(), 0);
}

#[test]
fn test_rollback_failure_is_reported() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    svc.begin(&mut ctx).unwrap();
    svc.set_rollback_only(&ctx).unwrap();
    manager.fail_rollback.store(true, Ordering::SeqCst);

    let err = svc.complete(&mut ctx).unwrap_err();

    assert!(matches!(err, FlowError::TransactionRollback { .. }));
    assert!(!ctx.is_in_scope());
}

#[test]
fn test_commit_failure_is_reported() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    svc.begin(&mut ctx).unwrap();
    manager.fail_commit.store(true, Ordering::SeqCst);

    let err = svc.complete(&mut ctx).unwrap_err();

    assert!(matches!(err, FlowError::TransactionCommit { cause: None, .. }));
    assert_eq!(svc.number_of_active_transactions(), 0);
}

#[test]
fn test_before_commit_callables_run_in_order_before_commit() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    svc.begin(&mut ctx).unwrap();

    for i in 0..3 {
        let order = order.clone();
        svc.register_before_commit_callable(&mut ctx, move || {
            order.borrow_mut().push(i);
            Ok(())
        })
        .unwrap();
    }
    assert_eq!(ctx.pending_callables(), 3);
    svc.complete(&mut ctx).unwrap();

    assert_eq!(*order.borrow(), vec![0, 1, 2]);
    assert_eq!(manager.count("commit"), 1);
    assert_eq!(ctx.pending_callables(), 0);
}

#[test]
fn test_failing_callable_rolls_back_and_still_runs_the_others() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();
    let ran = Rc::new(RefCell::new(0));
    svc.begin(&mut ctx).unwrap();

    svc.register_before_commit_callable(&mut ctx, || {
        Err(FlowError::Internal {
            message: "index write failed".to_string(),
        })
    })
    .unwrap();
    let counter = ran.clone();
    svc.register_before_commit_callable(&mut ctx, move || {
        *counter.borrow_mut() += 1;
        Ok(())
    })
    .unwrap();

    let err = svc.complete(&mut ctx).unwrap_err();

    match err {
        FlowError::TransactionCommit { cause: Some(cause), .. } => {
            assert!(matches!(*cause, FlowError::Internal { .. }))
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(*ran.borrow(), 1);
    assert_eq!(manager.calls(), vec!["begin", "set_rollback_only", "commit"]);
    assert_eq!(manager.open_transactions(), 0);
    assert_eq!(svc.number_of_active_transactions(), 0);
}

#[test]
fn test_callable_requires_active_transaction() {
    let (svc, _) = service();
    let mut ctx = TransactionContext::new();

    let err = svc
        .register_before_commit_callable(&mut ctx, || Ok(()))
        .unwrap_err();

    assert!(matches!(err, FlowError::TransactionNotFound { .. }));
}

struct StateRecorder {
    states: Mutex<Vec<TransactionState>>,
    veto: bool,
}

impl TransactionSynchronization for StateRecorder {
    fn before_commit(&self) -> Result<()> {
        if self.veto {
            return Err(FlowError::Internal {
                message: "veto".to_string(),
            });
        }
        Ok(())
    }

    fn after_completion(&self, state: TransactionState) -> Result<()> {
        self.states.lock().unwrap().push(state);
        Ok(())
    }
}

#[test]
fn test_synchronization_sees_commit_and_rollback() {
    let (svc, _) = service();
    let recorder = Arc::new(StateRecorder {
        states: Mutex::new(Vec::new()),
        veto: false,
    });

    let mut ctx = TransactionContext::new();
    svc.begin(&mut ctx).unwrap();
    svc.register_synchronization(&ctx, recorder.clone()).unwrap();
    svc.complete(&mut ctx).unwrap();

    svc.begin(&mut ctx).unwrap();
    svc.register_synchronization(&ctx, recorder.clone()).unwrap();
    svc.set_rollback_only(&ctx).unwrap();
    svc.complete(&mut ctx).unwrap();

    assert_eq!(
        *recorder.states.lock().unwrap(),
        vec![TransactionState::Committed, TransactionState::RolledBack]
    );
}

#[test]
fn test_synchronization_veto_fails_commit() {
    let (svc, _) = service();
    let recorder = Arc::new(StateRecorder {
        states: Mutex::new(Vec::new()),
        veto: true,
    });
    let mut ctx = TransactionContext::new();
    svc.begin(&mut ctx).unwrap();
    svc.register_synchronization(&ctx, recorder.clone()).unwrap();

    let err = svc.complete(&mut ctx).unwrap_err();

    assert!(matches!(err, FlowError::TransactionCommit { .. }));
    assert_eq!(
        *recorder.states.lock().unwrap(),
        vec![TransactionState::RolledBack]
    );
    assert_eq!(svc.number_of_active_transactions(), 0);
}

#[test]
fn test_synchronization_requires_transaction() {
    let (svc, _) = service();
    let ctx = TransactionContext::new();
    let recorder = Arc::new(StateRecorder {
        states: Mutex::new(Vec::new()),
        veto: false,
    });

    let err = svc.register_synchronization(&ctx, recorder).unwrap_err();
    assert!(matches!(err, FlowError::TransactionNotFound { .. }));
}

#[test]
fn test_execute_in_transaction_commits_result() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();

    let value = svc
        .execute_in_transaction(&mut ctx, |inner| {
            assert!(inner.is_in_scope());
            Ok(42)
        })
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(manager.calls(), vec!["begin", "commit"]);
}

#[test]
fn test_execute_in_transaction_rolls_back_on_error() {
    let (svc, manager) = service();
    let mut ctx = TransactionContext::new();

    let err = svc
        .execute_in_transaction(&mut ctx, |_| -> Result<()> {
            Err(FlowError::FlowNodeNotFound { flow_node_id: 9 })
        })
        .unwrap_err();

    assert_eq!(err, FlowError::FlowNodeNotFound { flow_node_id: 9 });
    assert_eq!(manager.calls(), vec!["begin", "set_rollback_only", "rollback"]);
    assert!(!ctx.is_in_scope());
    assert_eq!(svc.number_of_active_transactions(), 0);
}

#[test]
fn test_execute_locked_releases_lock_after_completion() {
    let (svc, _) = service();
    let store = InMemoryProcessStore::new();
    let mut ctx = TransactionContext::new();

    let held = svc
        .execute_locked(&mut ctx, &store, 5, "process_instance", |_| {
            Ok(store.is_locked(5, "process_instance"))
        })
        .unwrap();

    assert!(held);
    assert!(!store.is_locked(5, "process_instance"));
}

#[test]
fn test_execute_locked_fails_when_lock_is_taken() {
    let (svc, manager) = service();
    let store = InMemoryProcessStore::new();
    let mut ctx = TransactionContext::new();
    let _other = store.lock(5, "process_instance", "someone-else").unwrap();

    let err = svc
        .execute_locked(&mut ctx, &store, 5, "process_instance", |_| Ok(()))
        .unwrap_err();

    assert!(matches!(err, FlowError::Lock { .. }));
    assert!(manager.calls().is_empty());
}

/// Locks through the store but refuses every release
struct StuckLocks {
    inner: InMemoryProcessStore,
}

impl LockService for StuckLocks {
    fn lock(&self, object_id: i64, object_type: &str, owner: &str) -> Result<LockHandle> {
        self.inner.lock(object_id, object_type, owner)
    }

    fn unlock(&self, _handle: &LockHandle) -> Result<()> {
        Err(FlowError::Internal {
            message: "unlock refused".to_string(),
        })
    }
}

#[test]
fn test_execute_locked_keeps_result_when_unlock_fails() {
    let capture = init_test_capture();
    let (svc, manager) = service();
    let locks = StuckLocks {
        inner: InMemoryProcessStore::new(),
    };
    let mut ctx = TransactionContext::new();

    let value = svc
        .execute_locked(&mut ctx, &locks, 818181, "process_instance", |_| Ok(7))
        .unwrap();

    assert_eq!(value, 7);
    assert_eq!(manager.calls(), vec!["begin", "commit"]);
    assert_eq!(svc.number_of_active_transactions(), 0);
    let logged = capture.count_events(|e| {
        e.level == tracing::Level::ERROR
            && e.field("object_id") == Some("818181")
            && e.field("message")
                .is_some_and(|m| m.contains("a restart may be required"))
    });
    assert_eq!(logged, 1);
}

#[test]
fn test_counter_is_balanced_across_threads() {
    let manager = RecordingTransactionManager::new();
    let svc = Arc::new(TransactionService::new(manager.clone()));

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let svc = svc.clone();
            std::thread::spawn(move || {
                let mut ctx = TransactionContext::new();
                for i in 0..50 {
                    let _ = svc.execute_in_transaction(&mut ctx, |_| {
                        if (worker + i) % 3 == 0 {
                            Err(FlowError::Internal {
                                message: "fail".to_string(),
                            })
                        } else {
                            Ok(())
                        }
                    });
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(svc.number_of_active_transactions(), 0);
    assert_eq!(manager.open_transactions(), 0);
    assert_eq!(manager.count("begin"), 400);
}
