//! Raw events and flushed batches.

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// One opaque payload received from the event source.
///
/// Arrival order is carried by position (in the buffer, then in the batch),
/// not by a field on the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    payload: Bytes,
    received_at: DateTime<Utc>,
}

impl RawEvent {
    /// Wrap a payload, stamping it with the current time.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self::received_at(payload, Utc::now())
    }

    /// Wrap a payload with an explicit receive time.
    pub fn received_at(payload: impl Into<Bytes>, received_at: DateTime<Utc>) -> Self {
        Self {
            payload: payload.into(),
            received_at,
        }
    }

    /// Raw payload bytes, exactly as delivered by the source.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Time the event was taken off the bus.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// The buffer's exact contents at one flush.
#[derive(Debug, Clone)]
pub struct Batch {
    sequence: u64,
    flushed_at: DateTime<Utc>,
    events: Vec<RawEvent>,
    is_final: bool,
}

impl Batch {
    pub fn new(sequence: u64, events: Vec<RawEvent>, is_final: bool) -> Self {
        Self {
            sequence,
            flushed_at: Utc::now(),
            events,
            is_final,
        }
    }

    /// Monotonic flush counter, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn flushed_at(&self) -> DateTime<Utc> {
        self.flushed_at
    }

    /// Events in arrival order.
    pub fn events(&self) -> &[RawEvent] {
        &self.events
    }

    /// True for the batch produced by the shutdown flush.
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<RawEvent> {
        self.events
    }
}
