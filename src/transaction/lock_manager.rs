use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::debug;

use crate::{
    heap::HeapPageID,
    transaction::{Lock, PageLock, Permission, Transaction, TransactionID},
    types::DbResult,
};

/// Tracks which page locks each transaction currently holds.
pub struct LockManager {
    // key: transaction id, value: the locks it holds
    lock_map: Mutex<HashMap<TransactionID, HashMap<HeapPageID, Arc<PageLock>>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            lock_map: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the lock in the requested mode (blocking), then record
    /// it under the transaction.
    pub fn grab_lock(&self, tx: &Transaction, lock: &Arc<PageLock>, perm: Permission) -> DbResult {
        let tid = tx.get_id();
        match perm.to_lock() {
            Lock::SLock => lock.s_lock(tid)?,
            Lock::XLock => lock.x_lock(tid)?,
        }

        self.lock_map
            .lock()
            .unwrap()
            .entry(tid)
            .or_insert_with(HashMap::new)
            .insert(lock.get_pid(), Arc::clone(lock));
        Ok(())
    }

    /// Release one page lock before the transaction ends. The name
    /// carries the warning: callers step outside two-phase locking and
    /// accept the consequences.
    pub fn unsafe_release(&self, tx: &Transaction, pid: &HeapPageID) {
        let tid = tx.get_id();
        let lock = {
            let mut lock_map = self.lock_map.lock().unwrap();
            match lock_map.get_mut(&tid) {
                Some(locks) => locks.remove(pid),
                None => None,
            }
        };

        if let Some(lock) = lock {
            debug!("tx_{} releases page {} early", tid, pid);
            lock.release_all(tid);
        }
    }

    /// Release every lock the transaction holds.
    pub fn release_all(&self, tid: TransactionID) {
        let locks = self.lock_map.lock().unwrap().remove(&tid);
        if let Some(locks) = locks {
            for lock in locks.values() {
                lock.release_all(tid);
            }
        }
    }

    pub fn holds_lock(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        let tid = tx.get_id();
        let lock = {
            let lock_map = self.lock_map.lock().unwrap();
            lock_map.get(&tid).and_then(|locks| locks.get(pid)).cloned()
        };

        match lock {
            Some(lock) => lock.holds_lock(tid),
            None => false,
        }
    }

    /// True iff any transaction currently holds the page's lock. The
    /// eviction path uses this to keep in-flight pages in memory.
    pub fn is_locked(&self, lock: &PageLock) -> bool {
        !lock.get_holders().is_empty()
    }
}
