//! Outbound (Driven) ports for the ingestion pipeline.
//!
//! These traits define the external systems the pipeline reads from and
//! writes to.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{RawEvent, SinkError, SourceError};

/// Pollable, at-least-once message source keyed by topic.
///
/// Owned by exactly one ingestion loop, hence `&mut self`.
#[async_trait]
pub trait EventSource: Send {
    /// Subscribes to `topic`. Must succeed before the first poll.
    async fn subscribe(&mut self, topic: &str) -> Result<(), SourceError>;

    /// Waits up to `timeout` for the next event.
    ///
    /// # Returns
    /// - `Ok(Some(event))`: an event was delivered
    /// - `Ok(None)`: the timeout elapsed with nothing to deliver
    /// - `Err`: a transport error; the caller may poll again
    async fn poll(&mut self, timeout: Duration) -> Result<Option<RawEvent>, SourceError>;
}

#[async_trait]
impl<T: EventSource + ?Sized> EventSource for Box<T> {
    async fn subscribe(&mut self, topic: &str) -> Result<(), SourceError> {
        (**self).subscribe(topic).await
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<RawEvent>, SourceError> {
        (**self).poll(timeout).await
    }
}

/// Durable external destination for every flushed event.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Forwards the raw payload of one event.
    async fn forward(&self, event: &RawEvent) -> Result<(), SinkError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Live delivery of flushed payloads to connected viewers.
///
/// Delivery is best effort; implementations must not block on slow viewers.
#[async_trait]
pub trait LiveBroadcast: Send + Sync {
    async fn broadcast(&self, payload: Bytes);
}
