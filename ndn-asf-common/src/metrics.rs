//! Traffic counters for faces and forwarders.
//!
//! The counters mirror what the scenario assertions and the CLI report need:
//! per-face packet counts in each direction.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/* ---------------------------------------------------------------- *
 * Simple Counter
 * ---------------------------------------------------------------- */

#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

impl Clone for Counter {
    fn clone(&self) -> Self {
        let c = Counter::new();
        c.value
            .store(self.value.load(Ordering::Relaxed), Ordering::Relaxed);
        c
    }
}

/* ---------------------------------------------------------------- *
 * Per-face traffic counters
 * ---------------------------------------------------------------- */

/// Packet counts observed on a single face, split by direction.
#[derive(Debug, Default, Clone)]
pub struct FaceCounters {
    pub n_in_interests: Counter,
    pub n_out_interests: Counter,
    pub n_in_data: Counter,
    pub n_out_data: Counter,
    pub n_in_nacks: Counter,
    pub n_out_nacks: Counter,
}

impl FaceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a plain-value snapshot, e.g. for a JSON report.
    pub fn snapshot(&self) -> FaceCountersSnapshot {
        FaceCountersSnapshot {
            n_in_interests: self.n_in_interests.value(),
            n_out_interests: self.n_out_interests.value(),
            n_in_data: self.n_in_data.value(),
            n_out_data: self.n_out_data.value(),
            n_in_nacks: self.n_in_nacks.value(),
            n_out_nacks: self.n_out_nacks.value(),
        }
    }
}

/// Plain-value snapshot of [`FaceCounters`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaceCountersSnapshot {
    pub n_in_interests: u64,
    pub n_out_interests: u64,
    pub n_in_data: u64,
    pub n_out_data: u64,
    pub n_in_nacks: u64,
    pub n_out_nacks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_arithmetic() {
        let c = Counter::new();
        c.increment();
        c.add(4);
        assert_eq!(c.value(), 5);
        c.reset();
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn face_counters_snapshot() {
        let counters = FaceCounters::new();
        counters.n_out_interests.add(3);
        counters.n_in_data.increment();
        let snap = counters.snapshot();
        assert_eq!(snap.n_out_interests, 3);
        assert_eq!(snap.n_in_data, 1);
        assert_eq!(snap.n_out_data, 0);
    }
}
