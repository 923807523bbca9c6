//! # LogTail Telemetry
//!
//! Observability for the LogTail service.
//!
//! ## Components
//!
//! - Structured logging through `tracing-subscriber` (pretty or JSON)
//! - Optional distributed tracing via OpenTelemetry OTLP
//! - Prometheus metrics for the ingestion pipeline and the live hub
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lt_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(config).await.expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | unset | OTLP collector endpoint |
//! | `OTEL_SERVICE_NAME` | `logtail` | Service name in traces |
//! | `LT_LOG_LEVEL` | `info` | Log level filter |
//! | `LT_JSON_LOGS` | `false` | JSON log output |

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, BATCHES_FLUSHED,
    BROADCAST_DELIVERIES, BROADCAST_DROPPED, BUFFER_DEPTH, EVENTS_EVICTED, EVENTS_FLUSHED,
    EVENTS_INGESTED, FLUSH_DURATION, LIVE_CONNECTIONS, SINK_FAILURES, SOURCE_ERRORS,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging, optional trace export and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
/// When dropped, it flushes all pending spans.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;
    let tracing_guard = tracing_setup::init_tracing(&config).await?;

    Ok(TelemetryGuard {
        _tracing: tracing_guard,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::Config("bad filter".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: bad filter");
    }
}
