use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Condvar, Mutex, Weak},
};

use log::debug;

use crate::{error::DbError, heap::HeapPageID, transaction::TransactionID, types::DbResult, Database};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    XLock,
    SLock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::SLock,
            Permission::ReadWrite => Lock::XLock,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WakeUp {
    Retry,
    Aborted,
}

/// Waiter record of one blocked acquisition. Lives only while its
/// transaction blocks on a specific page lock.
#[derive(Debug)]
struct Ticket {
    tid: TransactionID,
    signal: Mutex<Option<WakeUp>>,
    cond: Condvar,
}

impl Ticket {
    fn new(tid: TransactionID) -> Arc<Ticket> {
        Arc::new(Ticket {
            tid,
            signal: Mutex::new(None),
            cond: Condvar::new(),
        })
    }

    fn wait(&self) -> WakeUp {
        let mut signal = self.signal.lock().unwrap();
        loop {
            match signal.take() {
                Some(wake_up) => return wake_up,
                None => {
                    signal = self.cond.wait(signal).unwrap();
                }
            }
        }
    }

    fn wake(&self, wake_up: WakeUp) {
        let mut signal = self.signal.lock().unwrap();

        // an abort must not be masked by a pending retry signal
        if *signal != Some(WakeUp::Aborted) {
            *signal = Some(wake_up);
        }
        self.cond.notify_one();
    }
}

#[derive(Debug)]
struct LockState {
    x_holder: Option<TransactionID>,
    s_holders: HashSet<TransactionID>,
    s_waiters: Vec<Arc<Ticket>>,
    x_waiters: VecDeque<Arc<Ticket>>,
}

impl LockState {
    /// Grant test per the compatibility matrix. Records the grant on
    /// success.
    fn try_grant(&mut self, tid: TransactionID, lock: Lock) -> bool {
        match lock {
            Lock::SLock => {
                if let Some(x_holder) = self.x_holder {
                    // a transaction already holding X trivially reads,
                    // no downgrade happens
                    return x_holder == tid;
                }

                self.s_holders.insert(tid);
                true
            }
            Lock::XLock => {
                if let Some(x_holder) = self.x_holder {
                    return x_holder == tid;
                }

                let sole_holder = self.s_holders.len() == 1 && self.s_holders.contains(&tid);
                if self.s_holders.is_empty() || sole_holder {
                    // S -> X upgrade is only allowed for the sole holder
                    self.s_holders.remove(&tid);
                    self.x_holder = Some(tid);
                    return true;
                }

                false
            }
        }
    }

    fn cancel_tickets(&mut self, tid: TransactionID) {
        self.s_waiters.retain(|t| {
            if t.tid == tid {
                t.wake(WakeUp::Aborted);
                false
            } else {
                true
            }
        });
        self.x_waiters.retain(|t| {
            if t.tid == tid {
                t.wake(WakeUp::Aborted);
                false
            } else {
                true
            }
        });
    }

    /// Lottery policy, run after every release: while the lock is not
    /// exclusively held, either grant all shared waiters in one batch,
    /// or wake exactly the head of the exclusive FIFO.
    fn run_wakeup(&mut self) {
        if self.x_holder.is_some() {
            return;
        }

        if !self.s_waiters.is_empty() {
            for ticket in self.s_waiters.drain(..) {
                ticket.wake(WakeUp::Retry);
            }
        } else if let Some(ticket) = self.x_waiters.pop_front() {
            ticket.wake(WakeUp::Retry);
        }
    }
}

/// The logical shared/exclusive lock of a single page. Exactly one
/// exists per page living in the buffer pool, created together with
/// the page.
#[derive(Debug)]
pub struct PageLock {
    pid: HeapPageID,
    state: Mutex<LockState>,
    weak_self: Weak<PageLock>,
}

impl PageLock {
    pub fn new(pid: HeapPageID) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| PageLock {
            pid,
            state: Mutex::new(LockState {
                x_holder: None,
                s_holders: HashSet::new(),
                s_waiters: Vec::new(),
                x_waiters: VecDeque::new(),
            }),
            weak_self: weak_self.clone(),
        })
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    /// Block until `tid` holds the shared lock. Idempotent if the lock
    /// is already held (in either mode). Fails with an `Aborted` error
    /// when the deadlock detector cancels the wait.
    pub fn s_lock(&self, tid: TransactionID) -> DbResult {
        self.acquire(tid, Lock::SLock)
    }

    /// Block until `tid` holds the exclusive lock. Idempotent if `tid`
    /// already holds X; an S -> X upgrade succeeds only if `tid` is the
    /// sole shared holder. Fails with an `Aborted` error when the
    /// deadlock detector cancels the wait.
    pub fn x_lock(&self, tid: TransactionID) -> DbResult {
        self.acquire(tid, Lock::XLock)
    }

    fn acquire(&self, tid: TransactionID, lock: Lock) -> DbResult {
        let detector = Database::deadlock_detector();
        let mut waited = false;

        loop {
            let ticket = {
                let mut state = self.state.lock().unwrap();
                if state.try_grant(tid, lock) {
                    drop(state);
                    if waited {
                        detector.unwait(tid, &self.pid);
                    }
                    return Ok(());
                }

                let ticket = Ticket::new(tid);
                match lock {
                    Lock::SLock => state.s_waiters.push(Arc::clone(&ticket)),
                    Lock::XLock => state.x_waiters.push_back(Arc::clone(&ticket)),
                }
                ticket
            };

            // The state mutex is dropped before talking to the detector:
            // the detection sweep takes lock states while holding the
            // detector mutex.
            let me = self.weak_self.upgrade().unwrap();
            detector.wait_for(tid, &me);
            waited = true;

            debug!("tx_{} waits for {:?} on page {}", tid, lock, self.pid);

            match ticket.wait() {
                WakeUp::Retry => continue,
                WakeUp::Aborted => {
                    detector.unwait(tid, &self.pid);
                    return Err(DbError::aborted(&format!(
                        "tx_{} aborted while waiting for {:?} on page {}",
                        tid, lock, self.pid
                    )));
                }
            }
        }
    }

    pub fn s_unlock(&self, tid: TransactionID) {
        let mut state = self.state.lock().unwrap();
        assert!(
            state.s_holders.remove(&tid),
            "tx_{} does not hold the shared lock on page {}",
            tid,
            self.pid
        );
        state.run_wakeup();
    }

    pub fn x_unlock(&self, tid: TransactionID) {
        let mut state = self.state.lock().unwrap();
        assert_eq!(
            state.x_holder,
            Some(tid),
            "tx_{} does not hold the exclusive lock on page {}",
            tid,
            self.pid
        );
        state.x_holder = None;
        state.run_wakeup();
    }

    /// Drop every hold `tid` has on this lock and cancel its waiting
    /// tickets, then run the wakeup policy.
    pub fn release_all(&self, tid: TransactionID) {
        let mut state = self.state.lock().unwrap();
        if state.x_holder == Some(tid) {
            state.x_holder = None;
        }
        state.s_holders.remove(&tid);
        state.cancel_tickets(tid);
        state.run_wakeup();
    }

    /// Abort delivery used by the deadlock detector: wake the waiting
    /// tickets of `tid` with an abort signal and unlink them.
    pub(crate) fn cancel_waiter(&self, tid: TransactionID) {
        let mut state = self.state.lock().unwrap();
        state.cancel_tickets(tid);
    }

    pub fn holds_lock(&self, tid: TransactionID) -> bool {
        let state = self.state.lock().unwrap();
        state.x_holder == Some(tid) || state.s_holders.contains(&tid)
    }

    pub fn holds_s_lock(&self, tid: TransactionID) -> bool {
        self.state.lock().unwrap().s_holders.contains(&tid)
    }

    pub fn holds_x_lock(&self, tid: TransactionID) -> bool {
        self.state.lock().unwrap().x_holder == Some(tid)
    }

    /// Snapshot of the current holders: the S set, a singleton X, or
    /// empty.
    pub fn get_holders(&self) -> Vec<TransactionID> {
        let state = self.state.lock().unwrap();
        match state.x_holder {
            Some(x_holder) => vec![x_holder],
            None => state.s_holders.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_then_reacquire() {
        let lock = PageLock::new(HeapPageID::new(0, 0));
        let t = 1;

        lock.x_lock(t).unwrap();
        assert!(lock.holds_x_lock(t));

        lock.x_unlock(t);
        assert!(!lock.holds_x_lock(t));

        lock.s_lock(t).unwrap();
        assert!(lock.holds_s_lock(t));

        lock.s_unlock(t);
        assert!(!lock.holds_s_lock(t));
        assert!(lock.get_holders().is_empty());
    }

    #[test]
    fn test_s_lock_is_idempotent() {
        let lock = PageLock::new(HeapPageID::new(0, 0));
        let t = 1;

        lock.s_lock(t).unwrap();
        lock.s_lock(t).unwrap();
        assert_eq!(lock.get_holders(), vec![t]);

        // a single unlock fully releases
        lock.s_unlock(t);
        assert!(lock.get_holders().is_empty());
    }

    #[test]
    fn test_upgrade_sole_holder() {
        let lock = PageLock::new(HeapPageID::new(0, 0));
        let t = 1;

        lock.s_lock(t).unwrap();
        lock.x_lock(t).unwrap();
        assert!(lock.holds_x_lock(t));
        assert!(!lock.holds_s_lock(t));
    }

    #[test]
    fn test_x_holder_reads_without_downgrade() {
        let lock = PageLock::new(HeapPageID::new(0, 0));
        let t = 1;

        lock.x_lock(t).unwrap();
        lock.s_lock(t).unwrap();
        assert!(lock.holds_x_lock(t));
        assert!(!lock.holds_s_lock(t));
    }

    #[test]
    fn test_shared_holders_coexist() {
        let lock = PageLock::new(HeapPageID::new(0, 0));

        for t in 1..=3 {
            lock.s_lock(t).unwrap();
        }
        for t in 1..=3 {
            assert!(lock.holds_s_lock(t));
            assert!(!lock.holds_x_lock(t));
        }
        assert_eq!(lock.get_holders().len(), 3);
    }

    #[test]
    #[should_panic]
    fn test_unlock_without_hold_panics() {
        let lock = PageLock::new(HeapPageID::new(0, 0));
        lock.s_unlock(42);
    }
}
