//! Hub and pump configuration.

use std::time::Duration;

/// Default per-connection outbound queue length.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Broadcast hub configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Length of the actor's command queue
    pub command_capacity: usize,
    /// Outbound queue length given to each joining connection
    pub queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_capacity: 1024,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Connection pump configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpConfig {
    /// Period between outgoing pings
    pub ping_interval: Duration,
    /// Close if nothing arrives from the peer for this long
    pub idle_timeout: Duration,
    /// Time the write side gets to finish after the read side stops
    pub close_grace: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(90),
            close_grace: Duration::from_millis(500),
        }
    }
}
