mod test_utils;

use std::{collections::HashSet, thread};

use heap_db::{
    transaction::Permission, types::DbResult, utils::HandyRwLock, Database, HeapPageID,
    Transaction,
};
use rand::Rng;

use crate::test_utils::{new_random_table, serial, setup};

/// Classic two-page deadlock: the younger transaction is chosen as the
/// victim, the older one ends up holding both pages.
#[test]
fn test_youngest_victim_aborts() {
    let _guard = serial();
    setup();

    // two pages worth of single-column tuples
    let (table_rc, _) = new_random_table("./deadlock_two_pages.db", 1, 600);
    let table_id = table_rc.rl().get_id();
    assert!(table_rc.rl().pages_count() >= 2);

    let pid_a = HeapPageID::new(table_id, 0);
    let pid_b = HeapPageID::new(table_id, 1);

    let t_old = Transaction::new();
    let t_young = Transaction::new();
    assert!(t_old.get_id() < t_young.get_id());

    Database::buffer_pool()
        .get_page(&t_old, Permission::ReadWrite, &pid_a)
        .unwrap();
    Database::buffer_pool()
        .get_page(&t_young, Permission::ReadWrite, &pid_b)
        .unwrap();

    let old_clone = t_old.clone();
    let old_handle = thread::spawn(move || -> DbResult {
        Database::buffer_pool()
            .get_page(&old_clone, Permission::ReadWrite, &pid_b)
            .map(|_| ())
    });

    let young_clone = t_young.clone();
    let young_handle = thread::spawn(move || -> DbResult {
        Database::buffer_pool()
            .get_page(&young_clone, Permission::ReadWrite, &pid_a)
            .map(|_| ())
    });

    let young_result = young_handle.join().unwrap();
    let err = young_result.unwrap_err();
    assert!(err.is_aborted(), "unexpected error: {}", err);

    // rolling the victim back lets the old transaction through
    t_young.abort().unwrap();
    old_handle.join().unwrap().unwrap();

    assert!(Database::buffer_pool().holds_lock(&t_old, &pid_a));
    assert!(Database::buffer_pool().holds_lock(&t_old, &pid_b));
    t_old.commit().unwrap();
}

/// An upgrade deadlock (both readers want to write) is broken the same
/// way: the younger reader dies.
#[test]
fn test_upgrade_deadlock_is_broken() {
    let _guard = serial();
    setup();

    let (table_rc, _) = new_random_table("./deadlock_upgrade.db", 2, 10);
    let pid = HeapPageID::new(table_rc.rl().get_id(), 0);

    let t_old = Transaction::new();
    let t_young = Transaction::new();

    Database::buffer_pool()
        .get_page(&t_old, Permission::ReadOnly, &pid)
        .unwrap();
    Database::buffer_pool()
        .get_page(&t_young, Permission::ReadOnly, &pid)
        .unwrap();

    let old_clone = t_old.clone();
    let old_handle = thread::spawn(move || -> DbResult {
        Database::buffer_pool()
            .get_page(&old_clone, Permission::ReadWrite, &pid)
            .map(|_| ())
    });

    let young_clone = t_young.clone();
    let young_handle = thread::spawn(move || -> DbResult {
        Database::buffer_pool()
            .get_page(&young_clone, Permission::ReadWrite, &pid)
            .map(|_| ())
    });

    let young_result = young_handle.join().unwrap();
    assert!(young_result.unwrap_err().is_aborted());
    t_young.abort().unwrap();

    old_handle.join().unwrap().unwrap();
    t_old.commit().unwrap();
}

/// Many transactions locking random page pairs in random order: every
/// thread terminates (commit or abort), and afterwards no lock is left
/// behind.
#[test]
fn test_random_contention_quiesces() {
    let _guard = serial();
    setup();

    let (table_rc, _) = new_random_table("./deadlock_stress.db", 1, 1600);
    let table_id = table_rc.rl().get_id();
    let pages_count = table_rc.rl().pages_count() as u32;
    assert!(pages_count >= 3);

    let mut handles = Vec::new();
    for _ in 0..8 {
        handles.push(thread::spawn(move || -> (usize, usize) {
            let mut rng = rand::thread_rng();
            let mut commits = 0;
            let mut aborts = 0;

            for _ in 0..10 {
                let first = rng.gen_range(0, pages_count);
                let second = rng.gen_range(0, pages_count);
                let tx = Transaction::new();

                let result = Database::buffer_pool()
                    .get_page(&tx, Permission::ReadWrite, &HeapPageID::new(table_id, first))
                    .and_then(|_| {
                        Database::buffer_pool().get_page(
                            &tx,
                            Permission::ReadWrite,
                            &HeapPageID::new(table_id, second),
                        )
                    });

                match result {
                    Ok(_) => {
                        tx.commit().unwrap();
                        commits += 1;
                    }
                    Err(e) => {
                        assert!(e.is_aborted(), "unexpected error: {}", e);
                        tx.abort().unwrap();
                        aborts += 1;
                    }
                }
            }
            (commits, aborts)
        }));
    }

    let mut total = 0;
    for handle in handles {
        let (commits, aborts) = handle.join().unwrap();
        total += commits + aborts;
    }
    assert_eq!(total, 80);

    // quiescence: a fresh transaction can write-lock every page at once
    let tx = Transaction::new();
    let mut seen = HashSet::new();
    for i in 0..pages_count {
        let pid = HeapPageID::new(table_id, i);
        let page_rc = Database::buffer_pool()
            .get_page(&tx, Permission::ReadWrite, &pid)
            .unwrap();
        assert_eq!(page_rc.rl().get_pg_lock().get_holders(), vec![tx.get_id()]);
        seen.insert(pid);
    }
    assert_eq!(seen.len(), pages_count as usize);
    tx.commit().unwrap();
}
