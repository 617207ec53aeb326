use std::{
    mem,
    sync::{Arc, Once, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    buffer::BufferPool,
    catalog::Catalog,
    transaction::DeadlockDetector,
    types::Pod,
    utils::HandyRwLock,
};

/// We collect all global variables here.
///
/// These variables cannot be initialized as static variables, because
/// their initialization functions all rely on non-const fn (e.g.
/// `HashMap::new()`).
pub struct Database {
    buffer_pool: Pod<BufferPool>,
    catalog: Pod<Catalog>,
    deadlock_detector: Arc<DeadlockDetector>,
}

static mut SINGLETON: *mut Database = 0 as *mut Database;

impl Database {
    fn new() -> Self {
        let deadlock_detector = DeadlockDetector::new();
        deadlock_detector.start();

        Self {
            buffer_pool: Arc::new(RwLock::new(BufferPool::new())),
            catalog: Arc::new(RwLock::new(Catalog::new())),
            deadlock_detector,
        }
    }

    /// Reset the memory status of the database, used for tests mostly.
    ///
    /// Actions:
    /// - The buffer pool is replaced (picking up a changed capacity).
    /// - The catalog is cleared.
    /// - The deadlock detector is replaced; the old sweep thread exits
    ///   on its next tick.
    pub fn reset() {
        let singleton = Self::new();

        unsafe {
            if !SINGLETON.is_null() {
                // Drop the previous db instance if it's already
                // initialized.
                mem::drop(Box::from_raw(SINGLETON));
            }

            // Put it in the heap so it can outlive this call.
            SINGLETON = mem::transmute(Box::new(singleton));
        }
    }

    // The buffer pool is a concurrent structure, a read guard is all
    // anybody ever needs.
    pub fn buffer_pool() -> RwLockReadGuard<'static, BufferPool> {
        Self::global().buffer_pool.rl()
    }

    pub fn catalog() -> RwLockReadGuard<'static, Catalog> {
        Self::global().catalog.rl()
    }

    pub fn mut_catalog() -> RwLockWriteGuard<'static, Catalog> {
        Self::global().catalog.wl()
    }

    pub fn deadlock_detector() -> Arc<DeadlockDetector> {
        Arc::clone(&Self::global().deadlock_detector)
    }

    pub fn global() -> &'static Self {
        static ONCE: Once = Once::new();

        ONCE.call_once(|| {
            // Make it
            let singleton = Self::new();

            unsafe {
                // Put it in the heap so it can outlive this call
                SINGLETON = mem::transmute(Box::new(singleton));
            }
        });

        unsafe {
            // Now we give out a copy of the data that is safe to use
            // concurrently.
            SINGLETON.as_ref().unwrap()
        }
    }
}
