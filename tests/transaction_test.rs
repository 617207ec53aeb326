mod test_utils;

use heap_db::{
    operators::SequentialScan, storage::Cell, transaction::Permission, utils::HandyRwLock,
    Database, HeapPageID, Transaction, Tuple,
};

use crate::test_utils::{new_random_table, serial, setup};

fn count_tuples(table_rc: &heap_db::types::Pod<heap_db::HeapTable>) -> usize {
    let tx = Transaction::new();
    let mut scan = SequentialScan::new(&tx, table_rc);
    let count = scan.by_ref().count();
    assert!(scan.error().is_none());
    tx.commit().unwrap();
    count
}

/// Committed inserts survive the page cache being dropped: FORCE wrote
/// them to disk at commit time.
#[test]
fn test_commit_makes_changes_durable() {
    let _guard = serial();
    setup();

    let (table_rc, values) = new_random_table("./tx_commit.db", 2, 100);
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    for i in 0..10 {
        let tuple = Tuple::new_int_tuples(i, 2);
        Database::buffer_pool()
            .insert_tuple(&tx, table_id, &tuple)
            .unwrap();
    }
    tx.commit().unwrap();

    assert_eq!(count_tuples(&table_rc), values.len() + 10);

    // drop every cached page; the data must come back from disk
    Database::buffer_pool().clear();
    assert_eq!(count_tuples(&table_rc), values.len() + 10);
}

/// Aborted changes vanish: the dirty pages are discarded and the next
/// reader sees the on-disk state.
#[test]
fn test_abort_discards_changes() {
    let _guard = serial();
    setup();

    let (table_rc, values) = new_random_table("./tx_abort.db", 2, 100);
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    for i in 0..10 {
        let tuple = Tuple::new_int_tuples(i, 2);
        Database::buffer_pool()
            .insert_tuple(&tx, table_id, &tuple)
            .unwrap();
    }
    tx.abort().unwrap();

    assert_eq!(count_tuples(&table_rc), values.len());
}

/// After completion (either way) the transaction holds nothing, and an
/// aborted transaction leaves no dirty page behind.
#[test]
fn test_complete_releases_everything() {
    let _guard = serial();
    setup();

    let (table_rc, _) = new_random_table("./tx_release.db", 1, 600);
    let table_id = table_rc.rl().get_id();
    let pages_count = table_rc.rl().pages_count() as u32;
    assert!(pages_count >= 2);

    let tx = Transaction::new();
    let mut pids = Vec::new();
    for i in 0..pages_count {
        let pid = HeapPageID::new(table_id, i);
        Database::buffer_pool()
            .get_page(&tx, Permission::ReadWrite, &pid)
            .unwrap();
        pids.push(pid);
    }
    let tuple = Tuple::new_int_tuples(7, 1);
    Database::buffer_pool()
        .insert_tuple(&tx, table_id, &tuple)
        .unwrap();

    tx.abort().unwrap();

    for pid in &pids {
        assert!(!Database::buffer_pool().holds_lock(&tx, pid));
    }

    // no page in the pool is still marked by the aborted transaction
    let check = Transaction::new();
    for pid in &pids {
        if let Ok(page_rc) =
            Database::buffer_pool().get_page(&check, Permission::ReadOnly, pid)
        {
            assert_ne!(page_rc.rl().is_dirty(), Some(tx.get_id()));
        }
    }
    check.commit().unwrap();
}

/// A transaction reads its own uncommitted writes; others see them only
/// after the commit.
#[test]
fn test_uncommitted_write_is_private() {
    let _guard = serial();
    setup();

    let (table_rc, _) = new_random_table("./tx_private.db", 2, 10);
    let table_id = table_rc.rl().get_id();
    let marker = Cell::Int64(424242);

    let writer = Transaction::new();
    let tuple = Tuple::new_from_cells(&[marker.clone(), marker.clone()]);
    Database::buffer_pool()
        .insert_tuple(&writer, table_id, &tuple)
        .unwrap();

    let own_view: Vec<Tuple> = SequentialScan::new(&writer, &table_rc)
        .map(|t| (*t).clone())
        .collect();
    assert!(own_view.iter().any(|t| t.get_cell(0) == marker));

    writer.commit().unwrap();
    assert!(count_tuples(&table_rc) == 11);
}

/// flush_pages and flush_all_pages push dirty pages out without ending
/// the transaction.
#[test]
fn test_explicit_flushes() {
    let _guard = serial();
    setup();

    let (table_rc, _) = new_random_table("./tx_flush.db", 2, 10);
    let table_id = table_rc.rl().get_id();
    let pid = HeapPageID::new(table_id, 0);

    let tx = Transaction::new();
    let tuple = Tuple::new_int_tuples(5, 2);
    Database::buffer_pool()
        .insert_tuple(&tx, table_id, &tuple)
        .unwrap();

    Database::buffer_pool().flush_pages(&tx).unwrap();
    let page_rc = Database::buffer_pool()
        .get_page(&tx, Permission::ReadOnly, &pid)
        .unwrap();
    assert_eq!(page_rc.rl().is_dirty(), None);
    assert!(Database::buffer_pool().holds_lock(&tx, &pid));

    Database::buffer_pool().flush_all_pages().unwrap();
    tx.commit().unwrap();
}
