//! Resolved sacrifice ballots, so a surface resolves at most once.
//!
//! A bounded FIFO set: when full, the oldest surface is evicted to make room.
//! Lookups are O(1) via a `HashSet`.

use coop_types::MessageRef;
use std::collections::{HashSet, VecDeque};

pub struct ResolvedBallots {
    set: HashSet<MessageRef>,
    order: VecDeque<MessageRef>,
    capacity: usize,
}

impl ResolvedBallots {
    pub fn new(capacity: usize) -> Self {
        Self {
            set: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Mark `surface` resolved. Returns `false` if it already was, so two
    /// racing resolutions of the same ballot let exactly one through.
    pub fn claim(&mut self, surface: MessageRef) -> bool {
        if self.set.contains(&surface) {
            return false;
        }
        if self.capacity == 0 {
            return true;
        }
        if self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.set.remove(&evicted);
            }
        }
        self.set.insert(surface);
        self.order.push_back(surface);
        true
    }

    pub fn contains(&self, surface: &MessageRef) -> bool {
        self.set.contains(surface)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
