//! Hub error types.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HubError {
    /// The hub is shutting down and accepts no new connections.
    #[error("live hub is shutting down")]
    ShuttingDown,

    /// The hub actor is no longer running.
    #[error("live hub has stopped")]
    HubStopped,
}
