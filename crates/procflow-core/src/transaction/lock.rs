//! Object locks held across a transactional unit of work

use crate::errors::Result;
use serde::{Deserialize, Serialize};

/// Proof of an acquired lock, handed back to `unlock`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockHandle {
    pub object_id: i64,
    pub object_type: String,
    pub owner: String,
}

pub trait LockService: Send + Sync {
    /// # Errors
    ///
    /// `Lock` when the object is held by someone else.
    fn lock(&self, object_id: i64, object_type: &str, owner: &str) -> Result<LockHandle>;

    /// # Errors
    ///
    /// `Lock` when the handle does not match the current holder.
    fn unlock(&self, handle: &LockHandle) -> Result<()>;
}
