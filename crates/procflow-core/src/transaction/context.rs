use crate::errors::Result;
use procflow_core_types::AssociationId;
use std::backtrace::Backtrace;

/// Work queued to run right before the underlying commit
pub type BeforeCommitCallable = Box<dyn FnOnce() -> Result<()>>;

/// Per-execution-context transaction state
///
/// Owned by whoever drives one request end to end and passed by `&mut` to
/// every boundary call. The association id is stable for the lifetime of the
/// context; everything else belongs to a single attempt and is cleared by
/// `TransactionService::complete`.
pub struct TransactionContext {
    association: AssociationId,
    pub(crate) in_scope: bool,
    pub(crate) externally_managed: bool,
    pub(crate) before_commit_callables: Vec<BeforeCommitCallable>,
    pub(crate) begun_at: Option<Backtrace>,
}

impl TransactionContext {
    pub fn new() -> Self {
        Self::with_association(AssociationId::new())
    }

    /// Bind the context to an existing association, e.g. one on which the
    /// caller already opened a transaction of its own
    pub fn with_association(association: AssociationId) -> Self {
        Self {
            association,
            in_scope: false,
            externally_managed: false,
            before_commit_callables: Vec::new(),
            begun_at: None,
        }
    }

    pub fn association(&self) -> &AssociationId {
        &self.association
    }

    /// Whether a scope opened by `begin` has not been completed yet
    pub fn is_in_scope(&self) -> bool {
        self.in_scope
    }

    /// Whether the current scope piggy-backs on a caller-owned transaction
    pub fn is_externally_managed(&self) -> bool {
        self.externally_managed
    }

    pub fn pending_callables(&self) -> usize {
        self.before_commit_callables.len()
    }

    pub(crate) fn reset(&mut self) {
        self.in_scope = false;
        self.externally_managed = false;
        self.before_commit_callables.clear();
        self.begun_at = None;
    }
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("association", &self.association)
            .field("in_scope", &self.in_scope)
            .field("externally_managed", &self.externally_managed)
            .field("before_commit_callables", &self.before_commit_callables.len())
            .finish()
    }
}
