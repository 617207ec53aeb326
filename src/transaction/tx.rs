use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{types::DbResult, Database};

/// Transaction ids increase monotonically, so a smaller id always
/// belongs to an older transaction.
pub type TransactionID = u64;

static TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Eq, PartialEq, Clone)]
pub struct Transaction {
    // increase monotonically by 1
    id: TransactionID,
}

impl Transaction {
    pub fn new() -> Self {
        let id = TRANSACTION_ID.fetch_add(1, Ordering::Relaxed);
        Self { id }
    }

    pub fn get_id(&self) -> TransactionID {
        self.id
    }

    pub fn commit(&self) -> DbResult {
        self.complete(true)
    }

    pub fn abort(&self) -> DbResult {
        self.complete(false)
    }

    fn complete(&self, commit: bool) -> DbResult {
        Database::buffer_pool().tx_complete(self, commit);
        Ok(())
    }
}

impl std::hash::Hash for Transaction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.id)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return write!(f, "{}", self);
    }
}
