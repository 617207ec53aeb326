use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use log::debug;

use crate::{
    heap::HeapPageID,
    transaction::{wait_for_graph::WaitForGraph, PageLock, TransactionID},
};

/// How often the background thread wakes up to look at the wait-for
/// graph.
pub const DETECT_INTERVAL: Duration = Duration::from_millis(10);

/// The graph churns rapidly while transactions make progress, so a
/// sweep only runs once it has been quiet for this long (and at most
/// once per such window). This batches cycles instead of chasing a
/// moving target.
pub const QUIESCE_THRESHOLD: Duration = Duration::from_millis(100);

struct DetectorState {
    // key: transaction id, value: the page locks it currently waits for
    wait_map: HashMap<TransactionID, HashMap<HeapPageID, Arc<PageLock>>>,

    last_update: Instant,
    last_check: Instant,
}

/// Background wait-for-graph cycle finder.
///
/// Victims are chosen per WOUND-WAIT: in every cycle the transaction
/// with the largest id (the youngest) is aborted, so the oldest member
/// always survives and the system as a whole makes progress. Abort
/// delivery goes through the victim's waiting tickets: a transaction
/// that is not blocked has no tickets registered here and cannot be
/// hit.
pub struct DeadlockDetector {
    state: Mutex<DetectorState>,
}

impl DeadlockDetector {
    pub fn new() -> Arc<Self> {
        Arc::new(DeadlockDetector {
            state: Mutex::new(DetectorState {
                wait_map: HashMap::new(),
                last_update: Instant::now(),
                last_check: Instant::now(),
            }),
        })
    }

    /// Spawn the sweep thread. It keeps a weak handle only and exits
    /// once the owning `Database` has been replaced.
    pub fn start(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        thread::Builder::new()
            .name("deadlock-detector".to_string())
            .spawn(move || loop {
                thread::sleep(DETECT_INTERVAL);
                match weak.upgrade() {
                    Some(detector) => detector.detect(),
                    None => break,
                }
            })
            .unwrap();
    }

    /// Record that `tid` waits on `lock`.
    pub fn wait_for(&self, tid: TransactionID, lock: &Arc<PageLock>) {
        let mut state = self.state.lock().unwrap();
        state
            .wait_map
            .entry(tid)
            .or_insert_with(HashMap::new)
            .insert(lock.get_pid(), Arc::clone(lock));
        state.last_update = Instant::now();
    }

    pub fn unwait(&self, tid: TransactionID, pid: &HeapPageID) {
        let mut state = self.state.lock().unwrap();
        if let Some(locks) = state.wait_map.get_mut(&tid) {
            locks.remove(pid);
            if locks.is_empty() {
                state.wait_map.remove(&tid);
            }
        }
        state.last_update = Instant::now();
    }

    pub fn unwait_all(&self, tid: TransactionID) {
        let mut state = self.state.lock().unwrap();
        state.wait_map.remove(&tid);
        state.last_update = Instant::now();
    }

    /// One sweep. Holds the detector mutex throughout, so the graph it
    /// enumerates is a consistent point-in-time snapshot (every edge
    /// mutation takes the same mutex).
    fn detect(&self) {
        let mut state = self.state.lock().unwrap();

        let now = Instant::now();
        if now.duration_since(state.last_update) < QUIESCE_THRESHOLD
            || now.duration_since(state.last_check) < QUIESCE_THRESHOLD
        {
            return;
        }
        state.last_check = now;

        let mut graph = WaitForGraph::new();
        for (&tid, locks) in &state.wait_map {
            for lock in locks.values() {
                for holder in lock.get_holders() {
                    if holder != tid {
                        graph.add_edge(tid, holder);
                    }
                }
            }
        }

        let cycles = graph.find_cycles();
        if cycles.is_empty() {
            return;
        }

        let mut victims: HashSet<TransactionID> = HashSet::new();
        for cycle in &cycles {
            victims.insert(*cycle.iter().max().unwrap());
        }

        for victim in victims {
            if let Some(locks) = state.wait_map.remove(&victim) {
                debug!(
                    "deadlock found ({} cycle(s)), aborting tx_{}",
                    cycles.len(),
                    victim
                );
                for lock in locks.values() {
                    lock.cancel_waiter(victim);
                }
            }
        }
    }
}
