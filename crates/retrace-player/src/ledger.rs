//! Per-event retry bookkeeping.

use std::collections::HashMap;

/// Failure counts per event index plus the number of events given up on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryLedger {
    per_event: HashMap<usize, u32>,
    distinct_failed: u32,
}

impl RetryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one failure at `index` and returns the new count for it.
    pub fn record_failure(&mut self, index: usize) -> u32 {
        let count = self.per_event.entry(index).or_insert(0);
        *count += 1;
        *count
    }

    pub fn failures_at(&self, index: usize) -> u32 {
        self.per_event.get(&index).copied().unwrap_or(0)
    }

    /// Marks an event as skipped and returns the number of skipped events.
    pub fn mark_skipped(&mut self) -> u32 {
        self.distinct_failed += 1;
        self.distinct_failed
    }

    pub fn distinct_failed(&self) -> u32 {
        self.distinct_failed
    }

    pub fn total_failures(&self) -> u32 {
        self.per_event.values().sum()
    }

    pub fn reset(&mut self) {
        self.per_event.clear();
        self.distinct_failed = 0;
    }
}
