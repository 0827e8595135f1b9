//! Logging collaborator consumed by policy updates.
//!
//! Emitting a record is a fire-and-forget side effect: it happens after the
//! gradients have been computed and never participates in differentiation.

use std::sync::{Arc, Mutex};

/// Metric key reported by every learning policy.
pub const ACTOR_LOSS: &str = "Actor loss";
/// Metric key reported by the bootstrapped actor-critic policy.
pub const CRITIC_LOSS: &str = "Critic loss";
/// Metric key reported by the REINFORCE-with-baseline policy.
pub const VALUE_NETWORK_LOSS: &str = "Value network loss";

/// One row of named scalars produced by a single `update` call.
pub type MetricRecord = Vec<(&'static str, f32)>;

/// Sink for training metrics.
///
/// Policies declare the keys they may emit through `Policy::logger_entries`
/// so sinks can pre-register columns before the first record arrives.
pub trait MetricLogger {
    fn record(&mut self, metrics: &MetricRecord);
}

/// Shared handles: a policy can hold one end of an `Arc<Mutex<_>>` while the
/// trainer keeps the other to read results back.
impl<L: MetricLogger> MetricLogger for Arc<Mutex<L>> {
    fn record(&mut self, metrics: &MetricRecord) {
        if let Ok(mut inner) = self.lock() {
            inner.record(metrics);
        }
    }
}

/// In-memory sink that keeps every record in arrival order.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Vec<MetricRecord>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&MetricRecord> {
        self.records.last()
    }

    /// Last recorded value for `key`, if any record carried it.
    pub fn last_value(&self, key: &str) -> Option<f32> {
        self.records.iter().rev().find_map(|record| {
            record
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| *value)
        })
    }
}

impl MetricLogger for MemoryLogger {
    fn record(&mut self, metrics: &MetricRecord) {
        self.records.push(metrics.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_logger_keeps_arrival_order() {
        let mut logger = MemoryLogger::new();
        logger.record(&vec![(ACTOR_LOSS, 1.0)]);
        logger.record(&vec![(ACTOR_LOSS, 2.0), (CRITIC_LOSS, 0.5)]);
        assert_eq!(logger.records().len(), 2);
        assert_eq!(logger.last_value(ACTOR_LOSS), Some(2.0));
        assert_eq!(logger.last_value(CRITIC_LOSS), Some(0.5));
        assert_eq!(logger.last_value(VALUE_NETWORK_LOSS), None);
    }

    #[test]
    fn shared_handle_records_through_the_mutex() {
        let shared = Arc::new(Mutex::new(MemoryLogger::new()));
        let mut handle = shared.clone();
        handle.record(&vec![(ACTOR_LOSS, 3.0)]);
        assert_eq!(shared.lock().unwrap().last_value(ACTOR_LOSS), Some(3.0));
    }
}
