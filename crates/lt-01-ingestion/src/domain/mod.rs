//! Domain layer for ingestion.
//!
//! Pure data and the bounded buffer; no I/O.

pub mod buffer;
pub mod config;
pub mod errors;
pub mod event;
pub mod record;

pub use buffer::BoundedBuffer;
pub use config::{
    ConfigError, KafkaConfig, PipelineConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_FLUSH_INTERVAL,
    DEFAULT_GROUP_ID, DEFAULT_POLL_TIMEOUT, DEFAULT_TOPIC,
};
pub use errors::{PipelineError, SinkError, SourceError};
pub use event::{Batch, RawEvent};
pub use record::{LogRecord, Severity};
