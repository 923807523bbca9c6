//! # Ingestion Subsystem
//!
//! Pulls raw log events off a message bus, holds them in a bounded buffer
//! and flushes them on a fixed interval to a log sink and to live viewers.
//!
//! ## Architecture
//!
//! | Layer | Contents |
//! |-------|----------|
//! | `domain` | [`RawEvent`], [`Batch`], [`BoundedBuffer`], [`LogRecord`], config, errors |
//! | `ports` | [`EventSource`], [`LogSink`], [`LiveBroadcast`] |
//! | `adapters` | [`InMemoryLogBus`], `KafkaEventSource` (feature `kafka`), [`TracingLogSink`], [`LokiLogSink`] |
//! | `service` | [`IngestionLoop`], [`FlushScheduler`], [`SinkFanout`], [`Pipeline`] |
//!
//! ## Guarantees
//!
//! - The buffer never holds more than its capacity; overflow drops the oldest event.
//! - A batch is the buffer's exact contents at drain time, in arrival order.
//! - Shutdown drains the buffer exactly once more, after ingestion has stopped.
//! - Delivery to the sink and to viewers is best effort.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(feature = "kafka")]
pub use adapters::KafkaEventSource;
pub use adapters::{BusConsumer, InMemoryLogBus, LokiLogSink, TracingLogSink};
pub use domain::*;
pub use ports::{EventSource, LiveBroadcast, LogSink};
pub use service::{
    DispatchOutcome, FlushReport, FlushScheduler, IngestionLoop, IngestionReport, Pipeline,
    PipelineHandle, PipelineReport, SinkFanout,
};
