//! In-memory transaction manager
//!
//! Reference implementation of [`TransactionManager`] used by the in-memory
//! runtime wiring and by tests. It tracks one transaction per association,
//! honours rollback-only marks and drives registered synchronizations. It
//! coordinates no resources of its own.

use crate::transaction::manager::{
    ManagerError, NativeSynchronization, StatusCode, TransactionHandle, TransactionManager,
};
use procflow_core_types::AssociationId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

struct InFlight {
    handle: TransactionHandle,
    rollback_only: bool,
    synchronizations: Vec<Box<dyn NativeSynchronization>>,
}

#[derive(Default)]
pub struct InMemoryTransactionManager {
    next_id: AtomicU64,
    in_flight: Mutex<HashMap<AssociationId, InFlight>>,
}

impl InMemoryTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of associations currently holding a transaction
    pub fn open_transactions(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<AssociationId, InFlight>> {
        // a panicking hook must not wedge every other association
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn no_transaction(association: &AssociationId) -> ManagerError {
        ManagerError::IllegalState(format!("no transaction bound to {}", association))
    }

    /// Runs every after-completion hook and reports the first failure
    fn notify(
        synchronizations: &[Box<dyn NativeSynchronization>],
        status: StatusCode,
    ) -> Result<(), ManagerError> {
        let mut first_failure = None;
        for sync in synchronizations {
            if let Err(e) = sync.after_completion(status) {
                first_failure.get_or_insert(e);
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

impl TransactionManager for InMemoryTransactionManager {
    fn begin(&self, association: &AssociationId) -> Result<(), ManagerError> {
        let mut table = self.table();
        if table.contains_key(association) {
            return Err(ManagerError::IllegalState(format!(
                "{} already has a transaction",
                association
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        table.insert(
            association.clone(),
            InFlight {
                handle: TransactionHandle {
                    id,
                    association: association.clone(),
                },
                rollback_only: false,
                synchronizations: Vec::new(),
            },
        );
        Ok(())
    }

    fn commit(&self, association: &AssociationId) -> Result<(), ManagerError> {
        // hooks run without the table lock held
        let (synchronizations, rollback_only) = {
            let mut table = self.table();
            let in_flight = table
                .get_mut(association)
                .ok_or_else(|| Self::no_transaction(association))?;
            (
                std::mem::take(&mut in_flight.synchronizations),
                in_flight.rollback_only,
            )
        };

        let mut failure = None;
        if rollback_only {
            failure = Some(ManagerError::RolledBack(
                "transaction was marked rollback-only".to_string(),
            ));
        } else {
            for sync in &synchronizations {
                if let Err(e) = sync.before_completion() {
                    failure = Some(ManagerError::RolledBack(e.to_string()));
                    break;
                }
            }
        }

        self.table().remove(association);

        match failure {
            Some(e) => {
                // the rollback outcome is what the caller must hear about
                let _ = Self::notify(&synchronizations, StatusCode::ROLLEDBACK);
                Err(e)
            }
            None => Self::notify(&synchronizations, StatusCode::COMMITTED),
        }
    }

    fn rollback(&self, association: &AssociationId) -> Result<(), ManagerError> {
        let in_flight = self
            .table()
            .remove(association)
            .ok_or_else(|| Self::no_transaction(association))?;
        Self::notify(&in_flight.synchronizations, StatusCode::ROLLEDBACK)
    }

    fn status(&self, association: &AssociationId) -> Result<StatusCode, ManagerError> {
        Ok(match self.table().get(association) {
            Some(in_flight) if in_flight.rollback_only => StatusCode::MARKED_ROLLBACK,
            Some(_) => StatusCode::ACTIVE,
            None => StatusCode::NO_TRANSACTION,
        })
    }

    fn transaction(
        &self,
        association: &AssociationId,
    ) -> Result<Option<TransactionHandle>, ManagerError> {
        Ok(self.table().get(association).map(|t| t.handle.clone()))
    }

    fn set_rollback_only(&self, association: &AssociationId) -> Result<(), ManagerError> {
        let mut table = self.table();
        let in_flight = table
            .get_mut(association)
            .ok_or_else(|| Self::no_transaction(association))?;
        in_flight.rollback_only = true;
        Ok(())
    }

    fn register_synchronization(
        &self,
        transaction: &TransactionHandle,
        synchronization: Box<dyn NativeSynchronization>,
    ) -> Result<(), ManagerError> {
        let mut table = self.table();
        match table.get_mut(&transaction.association) {
            Some(in_flight) if in_flight.handle.id == transaction.id => {
                in_flight.synchronizations.push(synchronization);
                Ok(())
            }
            _ => Err(ManagerError::IllegalState(format!(
                "transaction {} is no longer active",
                transaction.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    struct Probe {
        calls: Arc<StdMutex<Vec<String>>>,
        fail_before: bool,
    }

    impl NativeSynchronization for Probe {
        fn before_completion(&self) -> Result<(), ManagerError> {
            self.calls.lock().unwrap().push("before".to_string());
            if self.fail_before {
                return Err(ManagerError::System("veto".to_string()));
            }
            Ok(())
        }

        fn after_completion(&self, status: StatusCode) -> Result<(), ManagerError> {
            self.calls.lock().unwrap().push(format!("after:{}", status));
            Ok(())
        }
    }

    fn probe(fail_before: bool) -> (Box<Probe>, Arc<StdMutex<Vec<String>>>) {
        let calls = Arc::new(StdMutex::new(Vec::new()));
        (
            Box::new(Probe {
                calls: calls.clone(),
                fail_before,
            }),
            calls,
        )
    }

    #[test]
    fn test_commit_runs_hooks_in_order() {
        let tm = InMemoryTransactionManager::new();
        let a = AssociationId::new();
        tm.begin(&a).unwrap();
        let handle = tm.transaction(&a).unwrap().unwrap();
        let (p, calls) = probe(false);
        tm.register_synchronization(&handle, p).unwrap();

        tm.commit(&a).unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["before", "after:COMMITTED"]);
        assert_eq!(tm.status(&a).unwrap(), StatusCode::NO_TRANSACTION);
    }

    #[test]
    fn test_commit_of_rollback_only_rolls_back() {
        let tm = InMemoryTransactionManager::new();
        let a = AssociationId::new();
        tm.begin(&a).unwrap();
        tm.set_rollback_only(&a).unwrap();
        assert_eq!(tm.status(&a).unwrap(), StatusCode::MARKED_ROLLBACK);
        let handle = tm.transaction(&a).unwrap().unwrap();
        let (p, calls) = probe(false);
        tm.register_synchronization(&handle, p).unwrap();

        let err = tm.commit(&a).unwrap_err();

        assert!(matches!(err, ManagerError::RolledBack(_)));
        assert_eq!(*calls.lock().unwrap(), vec!["after:ROLLEDBACK"]);
        assert_eq!(tm.open_transactions(), 0);
    }

    #[test]
    fn test_before_completion_veto_rolls_back() {
        let tm = InMemoryTransactionManager::new();
        let a = AssociationId::new();
        tm.begin(&a).unwrap();
        let handle = tm.transaction(&a).unwrap().unwrap();
        let (p, calls) = probe(true);
        tm.register_synchronization(&handle, p).unwrap();

        assert!(tm.commit(&a).is_err());
        assert_eq!(*calls.lock().unwrap(), vec!["before", "after:ROLLEDBACK"]);
    }

    #[test]
    fn test_associations_are_independent() {
        let tm = InMemoryTransactionManager::new();
        let a = AssociationId::new();
        let b = AssociationId::new();
        tm.begin(&a).unwrap();

        assert_eq!(tm.status(&b).unwrap(), StatusCode::NO_TRANSACTION);
        tm.begin(&b).unwrap();
        assert!(tm.begin(&a).is_err());
        assert_eq!(tm.open_transactions(), 2);
    }

    #[test]
    fn test_stale_handle_cannot_register() {
        let tm = InMemoryTransactionManager::new();
        let a = AssociationId::new();
        tm.begin(&a).unwrap();
        let stale = tm.transaction(&a).unwrap().unwrap();
        tm.rollback(&a).unwrap();
        tm.begin(&a).unwrap();

        let (p, _) = probe(false);
        assert!(tm.register_synchronization(&stale, p).is_err());
    }
}
