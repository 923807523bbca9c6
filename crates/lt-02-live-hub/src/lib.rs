//! # Live Hub Subsystem
//!
//! Tracks connected live viewers and pushes every flushed log payload to
//! each of them.
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`BroadcastHub`] / [`HubHandle`] | Actor owning the connection registry |
//! | [`Connection`] | One registered viewer: id, outbound queue, lifecycle |
//! | [`ConnectionPump`] | Per-viewer read/write activities |
//! | [`Frame`] | Transport-neutral frame model |
//!
//! Delivery is best effort. A viewer whose queue fills up is disconnected
//! rather than slowing everyone else down.

pub mod domain;
pub mod hub;
pub mod pump;

pub use domain::{
    ConnectionId, ConnectionState, Frame, HubConfig, HubError, Lifecycle, PumpConfig,
    DEFAULT_QUEUE_CAPACITY,
};
pub use hub::{BroadcastHub, BroadcastOutcome, Connection, HubHandle};
pub use pump::{ConnectionPump, PumpExit};
