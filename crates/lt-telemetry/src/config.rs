//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging, trace export and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces and logs
    pub service_name: String,

    /// OpenTelemetry OTLP endpoint. Trace export is disabled when unset.
    pub otlp_endpoint: Option<String>,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Deployment environment label (development, staging, production)
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "logtail".to_string(),
            otlp_endpoint: None,
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            environment: "development".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: logtail)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT` or `OTLP_ENDPOINT`: enables OTLP trace export
    /// - `LT_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `LT_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `LT_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `LT_ENVIRONMENT`: Deployment environment (default: development)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "logtail".to_string()),

            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .or_else(|_| env::var("OTLP_ENDPOINT"))
                .ok()
                .filter(|v| !v.trim().is_empty()),

            log_level: env::var("LT_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("LT_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("LT_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            environment: env::var("LT_ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Whether spans should be exported over OTLP.
    pub fn trace_export_enabled(&self) -> bool {
        self.otlp_endpoint.is_some()
    }
}
