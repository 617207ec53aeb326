use std::{collections::VecDeque, sync::Arc};

use log::debug;

use crate::{
    error::DbError,
    heap::{HeapPageID, HeapTable},
    storage::WrappedTuple,
    transaction::{Permission, Transaction},
    types::Pod,
    utils::HandyRwLock,
    Database,
};

/// Pull-based scan over every tuple of a heap table, page by page,
/// under shared locks.
pub struct SequentialScan {
    tx: Transaction,
    table: Pod<HeapTable>,
    page_index: u32,
    buffered: VecDeque<WrappedTuple>,
    error: Option<DbError>,
}

impl SequentialScan {
    pub fn new(tx: &Transaction, table: &Pod<HeapTable>) -> Self {
        Self {
            tx: tx.clone(),
            table: Arc::clone(table),
            page_index: 0,
            buffered: VecDeque::new(),
            error: None,
        }
    }

    pub fn rewind(&mut self) {
        self.page_index = 0;
        self.buffered.clear();
        self.error = None;
    }

    /// The failure that ended the iteration, if any. An `Aborted` error
    /// here means the scanning transaction was chosen as a deadlock
    /// victim and must be rolled back by the caller.
    pub fn error(&self) -> Option<&DbError> {
        self.error.as_ref()
    }
}

impl Iterator for SequentialScan {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.buffered.pop_front() {
                return Some(tuple);
            }

            if self.error.is_some() {
                return None;
            }

            let (table_id, pages_count) = {
                let table = self.table.rl();
                (table.get_id(), table.pages_count())
            };
            if self.page_index as usize >= pages_count {
                return None;
            }

            let pid = HeapPageID::new(table_id, self.page_index);
            self.page_index += 1;

            match Database::buffer_pool()
                .get_page(&self.tx, Permission::ReadOnly, &pid)
            {
                Ok(page_rc) => {
                    self.buffered = page_rc.rl().tuples().into();

                    // The tuples are copied out, the read lock can go
                    // early so a long scan does not pin every page it
                    // ever touched. A write lock of the scanning
                    // transaction itself stays put.
                    let lock = page_rc.rl().get_pg_lock();
                    if !lock.holds_x_lock(self.tx.get_id()) {
                        Database::buffer_pool().unsafe_release_page(&self.tx, &pid);
                    }
                }
                Err(e) => {
                    debug!("scan of {} stopped by {}", self.tx, e);
                    self.error = Some(e);
                    return None;
                }
            }
        }
    }
}
