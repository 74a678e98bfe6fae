//! Bounded, most-recent-first audit log of decisions.

use std::collections::VecDeque;
use std::sync::RwLock;

use pulse_core::AiDecision;

/// Default number of decisions retained.
pub const DEFAULT_CAPACITY: usize = 100;

pub struct DecisionLog {
    entries: RwLock<VecDeque<AiDecision>>,
    capacity: usize,
}

impl DecisionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record a decision, evicting the oldest once full.
    pub fn push(&self, decision: AiDecision) {
        let mut entries = self.entries.write().expect("decision log lock");
        entries.push_front(decision);
        entries.truncate(self.capacity);
    }

    /// Up to `limit` decisions, newest first. A limit of 0 returns all.
    pub fn recent(&self, limit: usize) -> Vec<AiDecision> {
        let entries = self.entries.read().expect("decision log lock");
        let limit = if limit == 0 { entries.len() } else { limit };
        entries.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("decision log lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().expect("decision log lock").clear();
    }
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
