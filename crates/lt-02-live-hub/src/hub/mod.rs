//! Broadcast hub.
//!
//! The registry lives inside a single actor task. Join, leave and broadcast
//! are commands on one queue, so they are applied in the order they were
//! issued and a broadcast reaches exactly the connections registered when
//! its command is processed.
//!
//! Each connection has a bounded outbound queue. The hub only ever uses
//! `try_send`; a full or closed queue gets the connection evicted.

mod actor;
mod handle;

pub use handle::{BroadcastHub, BroadcastOutcome, Connection, HubHandle};
