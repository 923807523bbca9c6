//! Domain types for the live hub.

pub mod config;
pub mod connection;
pub mod errors;
pub mod frame;

pub use config::{HubConfig, PumpConfig, DEFAULT_QUEUE_CAPACITY};
pub use connection::{ConnectionId, ConnectionState, Lifecycle};
pub use errors::HubError;
pub use frame::Frame;
