//! Prometheus metrics for the LogTail pipeline.
//!
//! All metrics follow the naming convention: `lt_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., events_ingested_total)
//! - **Gauge**: Value that can go up or down (e.g., live_connections)
//! - **Histogram**: Distribution of values (e.g., flush_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, Encoder, Gauge, Histogram, HistogramOpts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Events appended to the buffer
    pub static ref EVENTS_INGESTED: Counter = Counter::new(
        "lt_events_ingested_total",
        "Total number of events received from the event source"
    ).expect("metric creation failed");

    /// Events dropped by the drop-oldest policy
    pub static ref EVENTS_EVICTED: Counter = Counter::new(
        "lt_events_evicted_total",
        "Total number of buffered events evicted before being flushed"
    ).expect("metric creation failed");

    /// Non-timeout errors from the event source
    pub static ref SOURCE_ERRORS: Counter = Counter::new(
        "lt_source_errors_total",
        "Total number of event source poll errors"
    ).expect("metric creation failed");

    /// Events currently waiting for the next flush
    pub static ref BUFFER_DEPTH: Gauge = Gauge::new(
        "lt_buffer_depth",
        "Number of events currently held in the bounded buffer"
    ).expect("metric creation failed");

    // =========================================================================
    // FLUSH / SINK
    // =========================================================================

    /// Batches handed to the fan-out
    pub static ref BATCHES_FLUSHED: Counter = Counter::new(
        "lt_batches_flushed_total",
        "Total number of non-empty batches flushed"
    ).expect("metric creation failed");

    /// Events handed to the fan-out
    pub static ref EVENTS_FLUSHED: Counter = Counter::new(
        "lt_events_flushed_total",
        "Total number of events flushed"
    ).expect("metric creation failed");

    /// Log sink forward failures
    pub static ref SINK_FAILURES: Counter = Counter::new(
        "lt_sink_failures_total",
        "Total number of events the log sink failed to accept"
    ).expect("metric creation failed");

    /// Time spent fanning out one batch
    pub static ref FLUSH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "lt_flush_duration_seconds",
            "Time spent forwarding one batch to the sink and the hub"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("valid bucket layout"))
    ).expect("metric creation failed");

    // =========================================================================
    // LIVE HUB
    // =========================================================================

    /// Payloads enqueued on connection queues
    pub static ref BROADCAST_DELIVERIES: Counter = Counter::new(
        "lt_broadcast_deliveries_total",
        "Total number of payloads enqueued for live viewers"
    ).expect("metric creation failed");

    /// Deliveries dropped because the connection was full or closing
    pub static ref BROADCAST_DROPPED: Counter = Counter::new(
        "lt_broadcast_dropped_total",
        "Total number of deliveries dropped for slow or closing viewers"
    ).expect("metric creation failed");

    /// Registered viewer connections
    pub static ref LIVE_CONNECTIONS: Gauge = Gauge::new(
        "lt_live_connections",
        "Number of currently registered viewer connections"
    ).expect("metric creation failed");
}

/// Handle for the registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Ingestion
        Box::new(EVENTS_INGESTED.clone()),
        Box::new(EVENTS_EVICTED.clone()),
        Box::new(SOURCE_ERRORS.clone()),
        Box::new(BUFFER_DEPTH.clone()),
        // Flush / sink
        Box::new(BATCHES_FLUSHED.clone()),
        Box::new(EVENTS_FLUSHED.clone()),
        Box::new(SINK_FAILURES.clone()),
        Box::new(FLUSH_DURATION.clone()),
        // Live hub
        Box::new(BROADCAST_DELIVERIES.clone()),
        Box::new(BROADCAST_DROPPED.clone()),
        Box::new(LIVE_CONNECTIONS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // May fail if already registered by another test, which is fine
        let _ = register_metrics();
    }

    #[test]
    fn test_counter_increment() {
        EVENTS_INGESTED.inc();
        assert!(EVENTS_INGESTED.get() >= 1.0);
    }

    #[test]
    fn test_gauge_set() {
        LIVE_CONNECTIONS.set(3.0);
        assert_eq!(LIVE_CONNECTIONS.get(), 3.0);
    }

    #[test]
    fn test_encode_contains_registered_metric() {
        let _ = register_metrics();
        BATCHES_FLUSHED.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("lt_batches_flushed_total"));
    }

    #[test]
    fn test_histogram_timer() {
        let before = FLUSH_DURATION.get_sample_count();
        {
            let _timer = HistogramTimer::new(&FLUSH_DURATION);
        }
        assert!(FLUSH_DURATION.get_sample_count() > before);
    }
}
