use std::collections::{HashMap, HashSet};

use crate::transaction::TransactionID;

/// Directed graph from waiting transactions to the transactions that
/// hold the locks they wait on. A cycle means deadlock.
pub(crate) struct WaitForGraph {
    // key: transaction id, value: the transactions that the key transaction is waiting for
    graph: HashMap<TransactionID, HashSet<TransactionID>>,
}

impl WaitForGraph {
    pub(crate) fn new() -> Self {
        Self {
            graph: HashMap::new(),
        }
    }

    pub(crate) fn add_edge(&mut self, from: TransactionID, to: TransactionID) {
        self.graph
            .entry(from)
            .or_insert_with(HashSet::new)
            .insert(to);
    }

    /// Find simple cycles by DFS with a path stack, each reported as
    /// the set of its member transactions. Rotations of the same cycle
    /// collapse into one set. The search records at most one cycle per
    /// starting node: a dense clique of waiters holds a factorial
    /// number of simple cycles, and later sweeps pick up whatever a
    /// bounded pass leaves behind.
    pub(crate) fn find_cycles(&self) -> Vec<HashSet<TransactionID>> {
        let mut cycles: Vec<HashSet<TransactionID>> = Vec::new();

        for &root in self.graph.keys() {
            let mut path = vec![root];
            self.dfs(root, root, &mut path, &mut cycles);
        }

        cycles
    }

    // Returns true once a cycle through `root` has been recorded.
    fn dfs(
        &self,
        root: TransactionID,
        current: TransactionID,
        path: &mut Vec<TransactionID>,
        cycles: &mut Vec<HashSet<TransactionID>>,
    ) -> bool {
        if let Some(nexts) = self.graph.get(&current) {
            for &next in nexts {
                if next == root {
                    let cycle: HashSet<TransactionID> = path.iter().copied().collect();
                    if !cycles.contains(&cycle) {
                        cycles.push(cycle);
                    }
                    return true;
                } else if !path.contains(&next) {
                    path.push(next);
                    let found = self.dfs(root, next, path, cycles);
                    path.pop();
                    if found {
                        return true;
                    }
                }
            }
        }
        false
    }
}
