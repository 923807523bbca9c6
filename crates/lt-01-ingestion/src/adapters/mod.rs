//! Adapters implementing the outbound ports.

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod loki;
pub mod memory_bus;
pub mod tracing_sink;

#[cfg(feature = "kafka")]
pub use kafka::KafkaEventSource;
pub use loki::LokiLogSink;
pub use memory_bus::{BusConsumer, InMemoryLogBus, DEFAULT_BUS_CAPACITY};
pub use tracing_sink::TracingLogSink;
