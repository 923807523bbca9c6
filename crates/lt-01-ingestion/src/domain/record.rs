//! Best-effort structured view of a raw payload.
//!
//! Producers on the platform publish JSON objects such as
//! `{"type":"error","message":"...","timestamp":"...","source":"order-service"}`
//! but nothing guarantees it. Decoding never fails: anything that is not a
//! JSON object is treated as plain text at `info` severity.

use std::fmt;

use serde_json::{Map, Value};

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    /// Parse a level name. Unknown names map to `Info`.
    pub fn from_level(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            "fatal" => Self::Fatal,
            _ => Self::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
    pub source: Option<String>,
    pub timestamp: Option<String>,
    /// Contents of the producer's `metadata` object, if any.
    pub attributes: Map<String, Value>,
    /// Whether the payload was a JSON object.
    pub structured: bool,
}

impl LogRecord {
    /// Decode a payload. Never fails.
    pub fn decode(payload: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(payload) {
            Ok(Value::Object(fields)) => Self::from_fields(fields, payload),
            _ => Self::plain(payload),
        }
    }

    fn plain(payload: &[u8]) -> Self {
        Self {
            severity: Severity::Info,
            message: String::from_utf8_lossy(payload).into_owned(),
            source: None,
            timestamp: None,
            attributes: Map::new(),
            structured: false,
        }
    }

    fn from_fields(mut fields: Map<String, Value>, payload: &[u8]) -> Self {
        let severity = ["level", "type"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(Severity::from_level)
            .unwrap_or(Severity::Info);

        let message = match fields.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => String::from_utf8_lossy(payload).into_owned(),
        };

        let attributes = match fields.remove("metadata") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Self {
            severity,
            message,
            source: string_field(&fields, "source"),
            timestamp: string_field(&fields, "timestamp"),
            attributes,
            structured: true,
        }
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_level_and_message() {
        let record = LogRecord::decode(br#"{"level":"error","message":"db down"}"#);
        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.message, "db down");
        assert!(record.structured);
    }

    #[test]
    fn test_decode_type_field_from_producers() {
        let record = LogRecord::decode(
            br#"{"type":"warning","message":"slow","source":"order-service","timestamp":"2024-01-01T00:00:00Z"}"#,
        );
        assert_eq!(record.severity, Severity::Warn);
        assert_eq!(record.source.as_deref(), Some("order-service"));
        assert_eq!(record.timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_level_takes_precedence_over_type() {
        let record = LogRecord::decode(br#"{"level":"debug","type":"error","message":"x"}"#);
        assert_eq!(record.severity, Severity::Debug);
    }

    #[test]
    fn test_missing_message_falls_back_to_payload() {
        let payload = br#"{"level":"info","count":3}"#;
        let record = LogRecord::decode(payload);
        assert_eq!(record.message, String::from_utf8_lossy(payload));
    }

    #[test]
    fn test_plain_text_payload() {
        let record = LogRecord::decode(b"service started");
        assert_eq!(record.severity, Severity::Info);
        assert_eq!(record.message, "service started");
        assert!(!record.structured);
    }

    #[test]
    fn test_json_non_object_is_plain() {
        let record = LogRecord::decode(b"[1,2,3]");
        assert!(!record.structured);
        assert_eq!(record.message, "[1,2,3]");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let record = LogRecord::decode(&[0xff, 0xfe, b'o', b'k']);
        assert!(record.message.ends_with("ok"));
    }

    #[test]
    fn test_metadata_becomes_attributes() {
        let record =
            LogRecord::decode(br#"{"message":"m","metadata":{"orderId":"42","retry":true}}"#);
        assert_eq!(record.attributes.get("orderId"), Some(&Value::from("42")));
        assert_eq!(record.attributes.len(), 2);
    }

    #[test]
    fn test_severity_names() {
        assert_eq!(Severity::from_level("TRACE"), Severity::Trace);
        assert_eq!(Severity::from_level("Warn"), Severity::Warn);
        assert_eq!(Severity::from_level("fatal"), Severity::Fatal);
        assert_eq!(Severity::from_level("success"), Severity::Info);
        assert_eq!(Severity::from_level("nonsense"), Severity::Info);
        assert_eq!(Severity::Error.to_string(), "ERROR");
    }
}
