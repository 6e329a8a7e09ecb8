//! Local de-dup set of transfers this relayer has finished.
//!
//! Not a source of truth: every reconcile re-reads ledger state first, so
//! losing this set on restart only costs a few redundant reads. Bounded with
//! oldest-first eviction so long-running relayers stay flat in memory.

use std::collections::{HashSet, VecDeque};

use ghostbridge_types::GhostId;

#[derive(Debug)]
pub struct ProcessedSet {
    done: HashSet<GhostId>,
    /// Insertion order, front = oldest.
    order: VecDeque<GhostId>,
    capacity: usize,
}

impl ProcessedSet {
    /// A zero capacity is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            done: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `id` as finished. Returns `false` if it already was.
    pub fn insert(&mut self, id: GhostId) -> bool {
        if self.done.contains(&id) {
            return false;
        }
        if self.done.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.done.remove(&oldest);
            }
        }
        self.done.insert(id);
        self.order.push_back(id);
        true
    }

    #[must_use]
    pub fn contains(&self, id: &GhostId) -> bool {
        self.done.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.done.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }
}
