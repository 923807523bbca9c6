//! Log sink that re-emits every event through `tracing`.

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

use crate::domain::{LogRecord, RawEvent, Severity, SinkError};
use crate::ports::LogSink;

/// Writes `Logged [LEVEL]: message` at the event's own severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl TracingLogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LogSink for TracingLogSink {
    async fn forward(&self, event: &RawEvent) -> Result<(), SinkError> {
        let record = LogRecord::decode(event.payload());
        let source = record.source.as_deref().unwrap_or("-");
        let level = record.severity;
        let message = record.message.as_str();

        match level {
            Severity::Trace => trace!(source, "Logged [{level}]: {message}"),
            Severity::Debug => debug!(source, "Logged [{level}]: {message}"),
            Severity::Info => info!(source, "Logged [{level}]: {message}"),
            Severity::Warn => warn!(source, "Logged [{level}]: {message}"),
            Severity::Error | Severity::Fatal => error!(source, "Logged [{level}]: {message}"),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forward_never_fails() {
        let sink = TracingLogSink::new();
        let payloads: [&'static [u8]; 3] = [
            br#"{"level":"fatal","message":"boom"}"#,
            b"plain text",
            &[0xff, 0x00],
        ];
        for payload in payloads {
            assert!(sink.forward(&RawEvent::new(payload)).await.is_ok());
        }
        assert_eq!(sink.name(), "tracing");
    }
}
