use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters for the decision pipeline.
///
/// All counters are relaxed atomics; a snapshot is not a consistent cut
/// across counters while readings are in flight.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    readings: AtomicU64,
    warm_up: AtomicU64,
    outliers: AtomicU64,
    admitted: AtomicU64,
    commands: AtomicU64,
    non_finite: AtomicU64,
    decode_failures: AtomicU64,
    publish_failures: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reading(&self) {
        self.readings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warm_up(&self) {
        self.warm_up.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outlier(&self) {
        self.outliers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_non_finite(&self) {
        self.non_finite.fetch_add(1, Ordering::Relaxed);
    }

    /// Inbound message dropped before reaching the engine
    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Command decided but not delivered
    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, entity_count: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            entity_count,
            readings: self.readings.load(Ordering::Relaxed),
            warm_up: self.warm_up.load(Ordering::Relaxed),
            outliers: self.outliers.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            non_finite: self.non_finite.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub entity_count: usize,
    pub readings: u64,
    pub warm_up: u64,
    pub outliers: u64,
    pub admitted: u64,
    pub commands: u64,
    pub non_finite: u64,
    pub decode_failures: u64,
    pub publish_failures: u64,
}
