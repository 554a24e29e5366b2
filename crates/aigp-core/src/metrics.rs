//! Prometheus metrics for governance emission.
//!
//! - `aigp_events_emitted_total` (counter) - events emitted, by event type
//! - `aigp_sink_failures_total` (counter) - failed sink calls, by sink
//! - `aigp_merkle_leaves` (histogram) - leaves per Merkle tree built

use prometheus::{CounterVec, Histogram, HistogramOpts, Opts, Registry};

use crate::error::Result;

const NAMESPACE: &str = "aigp";

/// Sink label for the governance event sink
pub const EVENT_SINK: &str = "event";

/// Sink label for the lineage sink
pub const LINEAGE_SINK: &str = "lineage";

/// Emission metrics, registered against a caller-supplied registry.
#[derive(Clone)]
pub struct EmitterMetrics {
    events_emitted_total: CounterVec,
    sink_failures_total: CounterVec,
    merkle_leaves: Histogram,
}

impl EmitterMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let events_emitted_total = CounterVec::new(
            Opts::new("events_emitted_total", "Governance events emitted").namespace(NAMESPACE),
            &["event_type"],
        )?;

        let sink_failures_total = CounterVec::new(
            Opts::new("sink_failures_total", "Governance sink calls that failed or panicked")
                .namespace(NAMESPACE),
            &["sink"],
        )?;

        let merkle_leaves = Histogram::with_opts(
            HistogramOpts::new("merkle_leaves", "Leaves per governance Merkle tree")
                .namespace(NAMESPACE)
                .buckets(vec![2.0, 3.0, 5.0, 10.0, 25.0, 50.0, 100.0, 500.0]),
        )?;

        registry.register(Box::new(events_emitted_total.clone()))?;
        registry.register(Box::new(sink_failures_total.clone()))?;
        registry.register(Box::new(merkle_leaves.clone()))?;

        Ok(Self {
            events_emitted_total,
            sink_failures_total,
            merkle_leaves,
        })
    }

    pub fn record_emitted(&self, event_type: &str) {
        self.events_emitted_total.with_label_values(&[event_type]).inc();
    }

    pub fn record_sink_failure(&self, sink: &str) {
        self.sink_failures_total.with_label_values(&[sink]).inc();
    }

    pub fn observe_merkle_leaves(&self, leaf_count: usize) {
        self.merkle_leaves.observe(leaf_count as f64);
    }

    pub fn emitted(&self, event_type: &str) -> u64 {
        self.events_emitted_total.with_label_values(&[event_type]).get() as u64
    }

    pub fn sink_failures(&self, sink: &str) -> u64 {
        self.sink_failures_total.with_label_values(&[sink]).get() as u64
    }
}

impl std::fmt::Debug for EmitterMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitterMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let registry = Registry::new();
        let metrics = EmitterMetrics::new(&registry).unwrap();

        metrics.record_emitted("INJECT_SUCCESS");
        metrics.record_emitted("INJECT_SUCCESS");
        metrics.record_sink_failure(EVENT_SINK);
        metrics.observe_merkle_leaves(3);

        assert_eq!(metrics.emitted("INJECT_SUCCESS"), 2);
        assert_eq!(metrics.sink_failures(EVENT_SINK), 1);
        assert_eq!(metrics.sink_failures(LINEAGE_SINK), 0);

        let names: Vec<String> = registry.gather().iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"aigp_events_emitted_total".to_string()));
        assert!(names.contains(&"aigp_sink_failures_total".to_string()));
        assert!(names.contains(&"aigp_merkle_leaves".to_string()));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        EmitterMetrics::new(&registry).unwrap();
        assert!(EmitterMetrics::new(&registry).is_err());
    }
}
