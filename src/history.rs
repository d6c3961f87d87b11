//! Bounded append-only log of concluded rounds and games.
//!
//! Newest first, capped (older entries fall off), and queryable by id so
//! the verification endpoints can serve proofs for anything still in the
//! window.

use std::collections::VecDeque;
use std::sync::RwLock;

/// A record that can be looked up for verification.
pub trait HistoryRecord: Clone {
    fn record_id(&self) -> &str;
}

/// Bounded newest-first log.
pub struct History<T: HistoryRecord> {
    entries: RwLock<VecDeque<T>>,
    capacity: usize,
}

impl<T: HistoryRecord> History<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Prepend a concluded record, evicting the oldest beyond capacity.
    pub fn push(&self, record: T) {
        let mut entries = self.entries.write().expect("history lock poisoned");
        entries.push_front(record);
        while entries.len() > self.capacity {
            entries.pop_back();
        }
    }

    pub fn find(&self, id: &str) -> Option<T> {
        self.entries
            .read()
            .expect("history lock poisoned")
            .iter()
            .find(|r| r.record_id() == id)
            .cloned()
    }

    /// Newest-first snapshot of up to `limit` records.
    pub fn recent(&self, limit: usize) -> Vec<T> {
        self.entries
            .read()
            .expect("history lock poisoned")
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("history lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
