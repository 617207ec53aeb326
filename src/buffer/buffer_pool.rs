use std::{
    collections::HashMap,
    process,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, RwLock,
    },
};

use log::{debug, error};

use crate::{
    buffer::Mru,
    error::DbError,
    heap::{HeapPage, HeapPageID},
    storage::{Tuple, WrappedTuple},
    transaction::{LockManager, Permission, Transaction},
    types::{DbResult, Pod, ResultPod},
    utils::HandyRwLock,
    Database,
};

pub const DEFAULT_PAGES: usize = 50;
pub const DEFAULT_PAGE_SIZE: usize = 4096;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);
static POOL_CAPACITY: AtomicUsize = AtomicUsize::new(DEFAULT_PAGES);

struct PoolState {
    pages: HashMap<HeapPageID, Pod<HeapPage>>,
    mru: Mru<HeapPageID>,
}

/// Bounded cache of heap pages and the entry point of every operator.
///
/// Two layers of synchronization, never nested the wrong way around:
/// the pool monitor guards the page map and the eviction order, the
/// per-page `PageLock` guards page contents. The monitor is always
/// released before a page lock is acquired, otherwise one blocked
/// transaction would stall the whole engine.
pub struct BufferPool {
    state: Mutex<PoolState>,
    lock_manager: LockManager,
    capacity: usize,
}

impl BufferPool {
    pub fn new() -> Self {
        let capacity = Self::get_capacity();
        Self {
            state: Mutex::new(PoolState {
                pages: HashMap::with_capacity(capacity),
                mru: Mru::new(capacity),
            }),
            lock_manager: LockManager::new(),
            capacity,
        }
    }

    pub fn set_page_size(page_size: usize) {
        PAGE_SIZE.store(page_size, Ordering::Relaxed);
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::Relaxed)
    }

    /// Takes effect for pools created afterwards (`Database::reset()`).
    pub fn set_capacity(capacity: usize) {
        POOL_CAPACITY.store(capacity, Ordering::Relaxed);
    }

    pub fn get_capacity() -> usize {
        POOL_CAPACITY.load(Ordering::Relaxed)
    }

    pub fn get_lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn size(&self) -> usize {
        self.state.lock().unwrap().pages.len()
    }

    /// Retrieve the specified page with the associated permissions.
    /// Will acquire a lock and may block if that lock is held by
    /// another transaction.
    ///
    /// The retrieved page should be looked up in the buffer pool. If
    /// it is present, it should be returned. If it is not present, it
    /// should be added to the buffer pool and returned. If there is
    /// insufficient space in the buffer pool, a page should be evicted
    /// and the new page should be added in its place.
    pub fn get_page(
        &self,
        tx: &Transaction,
        perm: Permission,
        pid: &HeapPageID,
    ) -> ResultPod<HeapPage> {
        let page_rc = {
            let mut state = self.state.lock().unwrap();
            match state.pages.get(pid) {
                Some(page_rc) => {
                    let page_rc = Arc::clone(page_rc);
                    state.mru.add(*pid);
                    page_rc
                }
                None => {
                    if state.pages.len() >= self.capacity {
                        self.evict_page(&mut state)?;
                    }

                    let table_rc = Database::catalog().get_table(&pid.table_id).ok_or_else(|| {
                        DbError::new(&format!("table {} not found", pid.table_id))
                    })?;
                    let page = table_rc.rl().read_page(pid)?;
                    let page_rc = Arc::new(RwLock::new(page));

                    state.pages.insert(*pid, Arc::clone(&page_rc));
                    state.mru.add(*pid);
                    debug!("page {} loaded, pool size: {}", pid, state.pages.len());
                    page_rc
                }
            }
        };

        let lock = page_rc.rl().get_pg_lock();
        self.lock_manager.grab_lock(tx, &lock, perm)?;
        Ok(page_rc)
    }

    /// Drop one page lock before the transaction ends, violating two-
    /// phase locking. Scans use it to shed read locks on pages they are
    /// done with; the caller accepts the consequences.
    pub fn unsafe_release_page(&self, tx: &Transaction, pid: &HeapPageID) {
        self.lock_manager.unsafe_release(tx, pid);
    }

    pub fn holds_lock(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        self.lock_manager.holds_lock(tx, pid)
    }

    /// Add the tuple to the specified table on behalf of the
    /// transaction. Pages dirtied by the operation come back from the
    /// table and are marked with the transaction id.
    pub fn insert_tuple(&self, tx: &Transaction, table_id: u32, tuple: &Tuple) -> DbResult {
        let table_rc = Database::catalog()
            .get_table(&table_id)
            .ok_or_else(|| DbError::new(&format!("table {} not found", table_id)))?;

        let dirtied = table_rc.rl().insert_tuple(tx, tuple)?;
        for page_rc in dirtied {
            page_rc.wl().mark_dirty(Some(tx.get_id()));
        }
        Ok(())
    }

    /// Remove the tuple from its table on behalf of the transaction.
    pub fn delete_tuple(&self, tx: &Transaction, tuple: &WrappedTuple) -> DbResult {
        let table_id = tuple.get_pid().table_id;
        let table_rc = Database::catalog()
            .get_table(&table_id)
            .ok_or_else(|| DbError::new(&format!("table {} not found", table_id)))?;

        let dirtied = table_rc.rl().delete_tuple(tx, tuple)?;
        for page_rc in dirtied {
            page_rc.wl().mark_dirty(Some(tx.get_id()));
        }
        Ok(())
    }

    /// End the transaction. On commit every page it dirtied is flushed
    /// to disk (FORCE); on abort they are discarded and will be re-read
    /// from disk on next access (dirty pages of uncommitted
    /// transactions never reach disk, so dropping the memory copy rolls
    /// them back). Either way all locks of the transaction are
    /// released afterwards.
    pub fn tx_complete(&self, tx: &Transaction, commit: bool) {
        let tid = tx.get_id();

        {
            let mut state = self.state.lock().unwrap();
            let dirty_pids: Vec<HeapPageID> = state
                .pages
                .iter()
                .filter(|(_, page_rc)| page_rc.rl().is_dirty() == Some(tid))
                .map(|(pid, _)| *pid)
                .collect();

            for pid in dirty_pids {
                if commit {
                    if let Err(e) = Self::flush_one(&state, &pid) {
                        // FORCE is broken at this point, there is no
                        // way to keep going
                        error!("flush of page {} failed at commit: {}", pid, e);
                        process::exit(1);
                    }
                } else {
                    state.pages.remove(&pid);
                    state.mru.remove(&pid);
                    debug!("page {} discarded on abort of tx_{}", pid, tid);
                }
            }
        }

        self.lock_manager.release_all(tid);
        Database::deadlock_detector().unwait_all(tid);
    }

    /// Write every dirty page to disk.
    pub fn flush_all_pages(&self) -> DbResult {
        let state = self.state.lock().unwrap();
        let pids: Vec<HeapPageID> = state.pages.keys().copied().collect();
        for pid in pids {
            Self::flush_one(&state, &pid)?;
        }
        Ok(())
    }

    /// Write the pages dirtied by the transaction to disk.
    pub fn flush_pages(&self, tx: &Transaction) -> DbResult {
        let tid = tx.get_id();
        let state = self.state.lock().unwrap();
        let pids: Vec<HeapPageID> = state
            .pages
            .iter()
            .filter(|(_, page_rc)| page_rc.rl().is_dirty() == Some(tid))
            .map(|(pid, _)| *pid)
            .collect();
        for pid in pids {
            Self::flush_one(&state, &pid)?;
        }
        Ok(())
    }

    /// Remove the specific page id from the buffer pool, discarding any
    /// in-memory state.
    pub fn discard_page(&self, pid: &HeapPageID) {
        let mut state = self.state.lock().unwrap();
        state.pages.remove(pid);
        state.mru.remove(pid);
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.pages.clear();
        while state.mru.evict().is_some() {}
    }

    fn flush_one(state: &PoolState, pid: &HeapPageID) -> DbResult {
        let page_rc = state
            .pages
            .get(pid)
            .ok_or_else(|| DbError::new(&format!("page {} not in pool", pid)))?;
        let table_rc = Database::catalog()
            .get_table(&pid.table_id)
            .ok_or_else(|| DbError::new(&format!("table {} not found", pid.table_id)))?;

        let data = page_rc.rl().get_page_data();
        table_rc.rl().write_page(pid, &data)?;
        page_rc.wl().mark_dirty(None);
        debug!("page {} flushed", pid);
        Ok(())
    }

    /// Make room for one page. Candidates come off the MRU end of the
    /// tracker; dirty pages (NO-STEAL) and pages whose lock is held are
    /// not eligible and are put back in their original order.
    fn evict_page(&self, state: &mut PoolState) -> DbResult {
        let mut skipped: Vec<HeapPageID> = Vec::new();
        let mut chosen: Option<HeapPageID> = None;

        while let Some(pid) = state.mru.evict() {
            let page_rc = Arc::clone(state.pages.get(&pid).unwrap());
            let page = page_rc.rl();
            if page.is_dirty().is_none() && !self.lock_manager.is_locked(&page.get_pg_lock()) {
                chosen = Some(pid);
                break;
            }
            skipped.push(pid);
        }

        for pid in skipped.iter().rev() {
            state.mru.add(*pid);
        }

        match chosen {
            Some(pid) => {
                // under FORCE the page is clean, writing it again is
                // harmless
                Self::flush_one(state, &pid)?;
                state.pages.remove(&pid);
                debug!("page {} evicted", pid);
                Ok(())
            }
            None => Err(DbError::new("all pages dirty/locked")),
        }
    }
}
