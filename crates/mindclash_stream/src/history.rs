//! Bounded event history for diagnostics and UI timelines.

use std::collections::VecDeque;

use crate::event::EventRecord;

/// Ring buffer of delivered events, most-recent-first.
///
/// Oldest records fall off once the capacity is reached; delivery order
/// is whatever the transport produced, not ledger-commit order.
pub struct EventHistory {
    records: VecDeque<EventRecord>,
    capacity: usize,
}

impl EventHistory {
    /// Default retention.
    pub const DEFAULT_CAPACITY: usize = 50;

    /// Creates an empty history with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates an empty history with a custom capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records one event, evicting the oldest when full.
    pub fn push(&mut self, record: EventRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_back();
        }
        self.records.push_front(record);
    }

    /// Snapshot of retained records, most recent first.
    #[must_use]
    pub fn recent(&self) -> Vec<EventRecord> {
        self.records.iter().cloned().collect()
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops all retained records.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new()
    }
}
