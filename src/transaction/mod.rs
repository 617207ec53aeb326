mod deadlock_detector;
mod lock_manager;
mod page_lock;
mod tx;
mod wait_for_graph;

pub use deadlock_detector::{DeadlockDetector, DETECT_INTERVAL, QUIESCE_THRESHOLD};
pub use lock_manager::LockManager;
pub use page_lock::{Lock, PageLock, Permission};
pub use tx::{Transaction, TransactionID};
