//! Connection identity and lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of one live viewer connection (UUID v7, time-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a viewer connection.
///
/// ```text
/// Connecting ──▶ Active ──▶ Closing ──▶ Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Active = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Active,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// Whether the connection is on its way out.
    pub fn is_terminating(&self) -> bool {
        *self >= Self::Closing
    }
}

/// Shared, forward-only connection state.
///
/// Held by both the hub registry and the connection's pump.
#[derive(Debug, Clone)]
pub struct Lifecycle(Arc<AtomicU8>);

impl Lifecycle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ConnectionState::Connecting as u8)))
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if it is later than the current state.
    ///
    /// Returns `false` when the state is already `next` or beyond.
    pub fn advance(&self, next: ConnectionState) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if current >= next as u8 {
                return false;
            }
            match self.0.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_uuid().get_version_num(), 7);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn test_lifecycle_moves_forward_only() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), ConnectionState::Connecting);

        assert!(lifecycle.advance(ConnectionState::Active));
        assert!(lifecycle.advance(ConnectionState::Closing));
        assert!(!lifecycle.advance(ConnectionState::Active));
        assert!(!lifecycle.advance(ConnectionState::Closing));
        assert_eq!(lifecycle.state(), ConnectionState::Closing);

        assert!(lifecycle.advance(ConnectionState::Closed));
        assert_eq!(lifecycle.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_lifecycle_can_skip_states() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.advance(ConnectionState::Closed));
        assert!(!lifecycle.advance(ConnectionState::Closing));
    }

    #[test]
    fn test_clones_share_state() {
        let lifecycle = Lifecycle::new();
        let shared = lifecycle.clone();
        lifecycle.advance(ConnectionState::Closing);
        assert!(shared.state().is_terminating());
    }
}
