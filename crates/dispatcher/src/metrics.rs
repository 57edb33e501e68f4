//! Per-transport counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single registered transport
#[derive(Debug, Default)]
pub struct TransportMetrics {
    /// Sends currently awaiting the transport
    in_flight: AtomicUsize,
    /// Total successful sends
    send_count: AtomicU64,
    /// Total sends that returned an error
    failure_count: AtomicU64,
    /// Total sends cut off by the per-send timeout
    timeout_count: AtomicU64,
    /// Total sends dropped by ANY short-circuit
    cancelled_count: AtomicU64,
}

impl TransportMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn inc_in_flight(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_in_flight(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::Relaxed)
    }

    pub fn inc_send_count(&self) {
        self.send_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeout_count(&self) -> u64 {
        self.timeout_count.load(Ordering::Relaxed)
    }

    pub fn inc_timeout_count(&self) {
        self.timeout_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cancelled_count(&self) -> u64 {
        self.cancelled_count.load(Ordering::Relaxed)
    }

    pub fn inc_cancelled_count(&self) {
        self.cancelled_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            in_flight: self.in_flight(),
            send_count: self.send_count(),
            failure_count: self.failure_count(),
            timeout_count: self.timeout_count(),
            cancelled_count: self.cancelled_count(),
        }
    }
}

/// Snapshot of transport metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub in_flight: usize,
    pub send_count: u64,
    pub failure_count: u64,
    pub timeout_count: u64,
    pub cancelled_count: u64,
}

impl MetricsSnapshot {
    /// Attempts that reached a verdict
    pub fn attempts(&self) -> u64 {
        self.send_count + self.failure_count + self.timeout_count + self.cancelled_count
    }
}
