//! Per-trace sequence numbering.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Monotonic, 1-based sequence numbers keyed by trace id.
///
/// Each emitter owns one counter. Read-increment-store happens under a
/// single lock, so concurrent emissions on one trace never share or skip
/// a number. Traces are independent of each other.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    counters: Mutex<HashMap<String, u64>>,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequence number for `trace_id`.
    pub fn next(&self, trace_id: &str) -> u64 {
        let mut counters = self.lock();
        let counter = counters.entry(trace_id.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Last number issued for `trace_id`, 0 if none.
    pub fn current(&self, trace_id: &str) -> u64 {
        self.lock().get(trace_id).copied().unwrap_or(0)
    }

    /// Drop the counter of a finished trace.
    pub fn end_trace(&self, trace_id: &str) {
        self.lock().remove(trace_id);
    }

    /// Number of traces being counted
    pub fn active_traces(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
