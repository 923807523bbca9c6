//! Log sink pushing to a Loki-compatible HTTP endpoint.
//!
//! Each event becomes one stream entry labelled with `service`, `level` and
//! `source`; the line is the raw payload text.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::domain::{LogRecord, RawEvent, SinkError};
use crate::ports::LogSink;

/// HTTP timeout for a single push.
pub const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

const PUSH_PATH: &str = "/loki/api/v1/push";

#[derive(Debug, Serialize)]
struct PushRequest {
    streams: Vec<PushStream>,
}

#[derive(Debug, Serialize)]
struct PushStream {
    stream: BTreeMap<&'static str, String>,
    /// `[timestamp in nanoseconds, line]` pairs.
    values: Vec<[String; 2]>,
}

/// Loki push client.
pub struct LokiLogSink {
    http_client: reqwest::Client,
    push_url: String,
    service: String,
}

impl LokiLogSink {
    /// `endpoint` is the server base URL, e.g. `http://loki:3100`.
    pub fn new(endpoint: &str, service: impl Into<String>) -> Result<Self, SinkError> {
        let http_client = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .map_err(|e| SinkError::Http(e.to_string()))?;

        Ok(Self {
            http_client,
            push_url: format!("{}{PUSH_PATH}", endpoint.trim_end_matches('/')),
            service: service.into(),
        })
    }

    pub fn push_url(&self) -> &str {
        &self.push_url
    }

    fn push_request(&self, event: &RawEvent) -> PushRequest {
        let record = LogRecord::decode(event.payload());

        let mut labels = BTreeMap::new();
        labels.insert("service", self.service.clone());
        labels.insert("level", record.severity.as_str().to_ascii_lowercase());
        labels.insert(
            "source",
            record.source.unwrap_or_else(|| "unknown".to_string()),
        );

        let nanos = event.timestamp().timestamp_nanos_opt().unwrap_or_default();
        let line = String::from_utf8_lossy(event.payload()).into_owned();

        PushRequest {
            streams: vec![PushStream {
                stream: labels,
                values: vec![[nanos.to_string(), line]],
            }],
        }
    }
}

#[async_trait]
impl LogSink for LokiLogSink {
    async fn forward(&self, event: &RawEvent) -> Result<(), SinkError> {
        let request = self.push_request(event);

        let response = self
            .http_client
            .post(&self.push_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %self.push_url, "Event pushed to Loki");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "loki"
    }
}
