/*!
 * Router counters, owned by one job.
 */

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters
#[derive(Debug, Default)]
pub struct RouterStats {
    total_segments: AtomicU64,
    low_confidence: AtomicU64,
    fallback_triggered: AtomicU64,
    errors: AtomicU64,
    failed: AtomicU64,
    below_threshold: AtomicU64,
    passthrough: AtomicU64,
    per_method: Mutex<BTreeMap<String, u64>>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterStatsSnapshot {
    pub total_segments: u64,
    /// Primary scored below the acceptance threshold
    pub low_confidence: u64,
    pub fallback_triggered: u64,
    /// Individual method invocation errors
    pub errors: u64,
    /// Segments no method could translate
    pub failed: u64,
    /// Segments accepted below the threshold
    pub below_threshold: u64,
    pub passthrough: u64,
    /// Selected candidates per method
    pub per_method: BTreeMap<String, u64>,
}

impl RouterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_segment(&self) {
        self.total_segments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_low_confidence(&self) {
        self.low_confidence.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallback_triggered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_below_threshold(&self) {
        self.below_threshold.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_passthrough(&self) {
        self.passthrough.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_selected(&self, method: &str) {
        *self.per_method.lock().entry(method.to_string()).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> RouterStatsSnapshot {
        RouterStatsSnapshot {
            total_segments: self.total_segments.load(Ordering::Relaxed),
            low_confidence: self.low_confidence.load(Ordering::Relaxed),
            fallback_triggered: self.fallback_triggered.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            below_threshold: self.below_threshold.load(Ordering::Relaxed),
            passthrough: self.passthrough.load(Ordering::Relaxed),
            per_method: self.per_method.lock().clone(),
        }
    }
}

impl RouterStatsSnapshot {
    /// Failed segments over all segments
    pub fn failure_rate(&self) -> f64 {
        if self.total_segments == 0 {
            0.0
        } else {
            self.failed as f64 / self.total_segments as f64
        }
    }
}
