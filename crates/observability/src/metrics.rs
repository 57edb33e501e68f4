//! Relay metrics
//!
//! Thin wrappers over the `metrics` facade plus an in-memory aggregator
//! for run summaries.

use std::collections::HashMap;

use contracts::{DeliveryStatus, DispatchResult};
use metrics::{counter, gauge, histogram};

/// Record the aggregate outcome of one `notify` call.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_dispatch;
///
/// let started = std::time::Instant::now();
/// let result = dispatcher.notify("FOO", payload, None).await;
/// if let Ok(ref r) = result {
///     record_dispatch(r, started.elapsed().as_secs_f64() * 1000.0);
/// }
/// ```
pub fn record_dispatch(result: &DispatchResult, latency_ms: f64) {
    let status = if result.succeeded { "success" } else { "failure" };
    counter!(
        "relay_notify_total",
        "label" => result.label.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!("relay_notify_latency_ms").record(latency_ms);
    gauge!("relay_last_fanout_size").set(result.outcomes.len() as f64);

    if result.outcomes.is_empty() {
        counter!("relay_notify_without_consumers_total").increment(1);
    }
}

/// Record a `notify` call that failed before any send (discovery unavailable)
pub fn record_discovery_unavailable(label: &str) {
    counter!(
        "relay_notify_total",
        "label" => label.to_string(),
        "status" => "discovery_unavailable"
    )
    .increment(1);
}

/// Record one delivery attempt
pub fn record_delivery(transport: &str, status: &DeliveryStatus) {
    let (status, reason) = match status {
        DeliveryStatus::Delivered => ("delivered", "none"),
        DeliveryStatus::Failed(e) => ("failed", e.reason()),
        DeliveryStatus::Cancelled => ("cancelled", "none"),
    };
    counter!(
        "relay_deliveries_total",
        "transport" => transport.to_string(),
        "status" => status,
        "reason" => reason
    )
    .increment(1);
}

/// Record the duration of one completed send
pub fn record_send_latency_ms(transport: &str, latency_ms: f64) {
    histogram!(
        "relay_send_latency_ms",
        "transport" => transport.to_string()
    )
    .record(latency_ms);
}

/// Record a Discovery Directory lookup.
///
/// `source` is one of `hit`, `miss`, `stale`, `error`.
pub fn record_discovery_lookup(backend: &str, source: &'static str) {
    counter!(
        "relay_discovery_lookups_total",
        "backend" => backend.to_string(),
        "source" => source
    )
    .increment(1);
}

/// Record the duration of a backend query
pub fn record_discovery_latency_ms(backend: &str, latency_ms: f64) {
    histogram!(
        "relay_discovery_latency_ms",
        "backend" => backend.to_string()
    )
    .record(latency_ms);
}

/// Dispatch metrics aggregator
///
/// Aggregates results in memory for end-of-run summaries.
#[derive(Debug, Clone, Default)]
pub struct RelayMetricsAggregator {
    pub total_notifies: u64,
    pub failed_notifies: u64,
    pub unavailable_notifies: u64,
    pub total_delivered: u64,
    pub total_failed_deliveries: u64,
    pub total_cancelled: u64,
    pub latency_stats: RunningStats,
    pub fanout_stats: RunningStats,
    /// Failed deliveries per consumer address
    pub failures_by_address: HashMap<String, u64>,
}

impl RelayMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one dispatch result (successful or not)
    pub fn update(&mut self, result: &DispatchResult, latency_ms: f64) {
        self.total_notifies += 1;
        if !result.succeeded {
            self.failed_notifies += 1;
        }

        self.total_delivered += result.delivered_count() as u64;
        self.total_cancelled += result.cancelled_count() as u64;
        for outcome in result.failed() {
            self.total_failed_deliveries += 1;
            *self
                .failures_by_address
                .entry(outcome.record.address.clone())
                .or_insert(0) += 1;
        }

        self.latency_stats.push(latency_ms);
        self.fanout_stats.push(result.outcomes.len() as f64);
    }

    /// Count a notify that never reached the dispatch stage
    pub fn update_unavailable(&mut self) {
        self.total_notifies += 1;
        self.failed_notifies += 1;
        self.unavailable_notifies += 1;
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_notifies: self.total_notifies,
            failed_notifies: self.failed_notifies,
            unavailable_notifies: self.unavailable_notifies,
            total_delivered: self.total_delivered,
            total_failed_deliveries: self.total_failed_deliveries,
            total_cancelled: self.total_cancelled,
            failure_rate: if self.total_notifies > 0 {
                self.failed_notifies as f64 / self.total_notifies as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            fanout: StatsSummary::from(&self.fanout_stats),
            failures_by_address: self.failures_by_address.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_notifies: u64,
    pub failed_notifies: u64,
    pub unavailable_notifies: u64,
    pub total_delivered: u64,
    pub total_failed_deliveries: u64,
    pub total_cancelled: u64,
    pub failure_rate: f64,
    pub latency_ms: StatsSummary,
    pub fanout: StatsSummary,
    pub failures_by_address: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Relay Metrics Summary ===")?;
        writeln!(
            f,
            "Notifies: {} ({} failed, {:.2}%)",
            self.total_notifies, self.failed_notifies, self.failure_rate
        )?;
        writeln!(f, "Discovery unavailable: {}", self.unavailable_notifies)?;
        writeln!(
            f,
            "Deliveries: {} delivered, {} failed, {} cancelled",
            self.total_delivered, self.total_failed_deliveries, self.total_cancelled
        )?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Fan-out: {}", self.fanout)?;

        if !self.failures_by_address.is_empty() {
            writeln!(f, "Failures by address:")?;
            for (address, count) in &self.failures_by_address {
                writeln!(f, "  {}: {}", address, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
