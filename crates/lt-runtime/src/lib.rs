//! # LogTail Runtime
//!
//! Wires the ingestion pipeline to the live hub and serves them over HTTP.
//!
//! ```text
//!  Kafka topic (feature `kafka`) ────────┐
//!                                        ▼
//!  POST /logs ──▶ InMemoryLogBus ──▶ Pipeline ──flush──▶ LogSink (tracing | Loki)
//!                                        │
//!                                        └──▶ HubBroadcastAdapter ──▶ BroadcastHub ──▶ /ws viewers
//! ```
//!
//! ## Modules
//!
//! - `config/` - environment configuration
//! - `adapters/` - port implementations bridging subsystems
//! - `http/` - axum router, CORS and the WebSocket endpoint
//! - `runtime` - startup and shutdown ordering

pub mod adapters;
pub mod config;
pub mod http;
pub mod runtime;

pub use config::{ConfigError, CorsConfig, ServiceConfig};
pub use runtime::LogTailRuntime;
