//! Transport-neutral frames exchanged with a viewer.

use bytes::Bytes;

/// One frame on a viewer's duplex connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Broadcast payload, written unmodified.
    Payload(Bytes),
    /// Liveness probe.
    Ping(Bytes),
    /// Liveness probe reply.
    Pong(Bytes),
    /// Orderly close.
    Close,
}

impl Frame {
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close)
    }
}
