//! Seen-event tracker.
//!
//! A bounded, session-lifetime set of event identifiers used to split
//! each refresh cycle's in-range events into "new" and "already seen".
//! Follows NASA Power of 10: bounded resources regardless of how long
//! the monitor runs (oldest ids are evicted FIFO at capacity).

use std::collections::{HashSet, VecDeque};

use crate::models::QuakeEvent;

/// Default capacity for the seen-set.
/// Sized for ~24 hours of earthquake data at peak activity.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Bounded set of previously observed event identifiers.
///
/// Lookup goes through a `HashSet`; insertion order is kept in a
/// `VecDeque` so the oldest entry can be evicted when full.
#[derive(Debug)]
pub struct SeenTracker {
    seen: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SeenTracker {
    /// Create a tracker with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be positive");

        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a tracker with default capacity.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Evaluate one cycle's in-range events and commit them.
    ///
    /// Returns the new alert candidates: events whose identifier was
    /// absent from the set at the start of the call AND whose magnitude
    /// meets `alert_threshold`. Afterwards every in-range identifier is
    /// committed, alerted or not, so low-magnitude events keep showing
    /// in the table without ever re-qualifying as new.
    ///
    /// The read, the candidate computation, and the write-back happen
    /// inside this single `&mut self` call; callers sharing the tracker
    /// across threads wrap it in a `Mutex` so overlapping cycles cannot
    /// both observe an identifier as new.
    pub fn classify_and_commit(
        &mut self,
        in_range: &[QuakeEvent],
        alert_threshold: f64,
    ) -> Vec<QuakeEvent> {
        let candidates: Vec<QuakeEvent> = in_range
            .iter()
            .filter(|e| !self.seen.contains(&e.id) && e.magnitude >= alert_threshold)
            .cloned()
            .collect();

        for event in in_range {
            self.insert(&event.id);
        }

        candidates
    }

    /// Insert an id, evicting the oldest if at capacity.
    fn insert(&mut self, id: &str) {
        if self.seen.contains(id) {
            return;
        }

        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }

        self.seen.insert(id.to_string());
        self.order.push_back(id.to_string());

        debug_assert!(self.order.len() <= self.capacity);
        debug_assert_eq!(self.order.len(), self.seen.len());
    }

    /// Number of tracked identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the tracker is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Forget everything (explicit user reset).
    pub fn reset(&mut self) {
        self.seen.clear();
        self.order.clear();
    }
}

impl Default for SeenTracker {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
