// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use once_cell::sync::Lazy;
use rand::Rng;

use heap_db::{
    buffer::{DEFAULT_PAGES, DEFAULT_PAGE_SIZE},
    small_int_schema,
    types::Pod,
    utils::{self, HandyRwLock},
    BufferPool, Database, HeapTable, Transaction, Tuple,
};

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Tests within one binary share the global database, so they take
/// this guard first.
pub fn serial() -> MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// # Conduct the initialization
///
/// - Setting up log configurations.
/// - Reset page size and pool capacity.
/// - Reset the database singleton.
pub fn setup() {
    utils::init_log();
    BufferPool::set_page_size(DEFAULT_PAGE_SIZE);
    BufferPool::set_capacity(DEFAULT_PAGES);
    Database::reset();
}

/// Like `setup`, but with a buffer pool bounded to `capacity` pages.
pub fn setup_with_capacity(capacity: usize) {
    utils::init_log();
    BufferPool::set_page_size(DEFAULT_PAGE_SIZE);
    BufferPool::set_capacity(capacity);
    Database::reset();
}

pub fn new_empty_table(path: &str, columns: usize) -> Pod<HeapTable> {
    let schema = small_int_schema(columns, "t");
    let table_rc = Arc::new(RwLock::new(HeapTable::new(path, &schema)));
    Database::mut_catalog().add_table(Arc::clone(&table_rc));
    table_rc
}

/// Create a table filled with `rows` random tuples, inserted through
/// the buffer pool by a single committed transaction. Returns the
/// table and the inserted values of the first column.
pub fn new_random_table(path: &str, columns: usize, rows: usize) -> (Pod<HeapTable>, Vec<i64>) {
    let table_rc = new_empty_table(path, columns);
    let table_id = table_rc.rl().get_id();

    let mut values = Vec::new();
    let mut rng = rand::thread_rng();

    let tx = Transaction::new();
    for _ in 0..rows {
        let value = rng.gen_range(i64::MIN / 2, i64::MAX / 2);
        let tuple = Tuple::new_int_tuples(value, columns);
        Database::buffer_pool()
            .insert_tuple(&tx, table_id, &tuple)
            .unwrap();
        values.push(value);
    }
    tx.commit().unwrap();

    (table_rc, values)
}

/// Create a table filled row by row with auto-committed transactions,
/// which keeps every page clean and unlocked. Friendly to tiny pools.
pub fn new_random_table_auto_tx(
    path: &str,
    columns: usize,
    rows: usize,
) -> (Pod<HeapTable>, Vec<i64>) {
    let table_rc = new_empty_table(path, columns);

    let mut values = Vec::new();
    let mut rng = rand::thread_rng();
    for _ in 0..rows {
        let value = rng.gen_range(i64::MIN / 2, i64::MAX / 2);
        let tuple = Tuple::new_int_tuples(value, columns);
        table_rc.rl().insert_tuple_auto_tx(&tuple).unwrap();
        values.push(value);
    }

    (table_rc, values)
}
