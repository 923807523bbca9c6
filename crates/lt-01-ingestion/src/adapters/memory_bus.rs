//! In-process, topic-keyed log bus.
//!
//! Stands in for an external broker: producers call [`InMemoryLogBus::publish`]
//! and each pipeline polls its own [`BusConsumer`]. Every topic is a
//! `tokio::sync::broadcast` channel, so a consumer that falls more than
//! `capacity` events behind loses the oldest ones and is told how many.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::domain::{RawEvent, SourceError};
use crate::ports::EventSource;

/// Default per-topic channel capacity.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Topic-keyed broadcast bus.
pub struct InMemoryLogBus {
    topics: RwLock<HashMap<String, broadcast::Sender<RawEvent>>>,
    capacity: usize,
    events_published: AtomicU64,
}

impl InMemoryLogBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            events_published: AtomicU64::new(0),
        }
    }

    /// Publish one payload to `topic`.
    ///
    /// Returns the number of consumers that will see it. With no consumers
    /// the payload is dropped.
    pub fn publish(&self, topic: &str, payload: impl Into<Bytes>) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        let event = RawEvent::new(payload);

        let topics = self.topics.read();
        let Some(sender) = topics.get(topic) else {
            warn!(topic, "Event dropped (no consumers for topic)");
            return 0;
        };

        match sender.send(event) {
            Ok(receivers) => {
                debug!(topic, receivers, "Event published");
                receivers
            }
            Err(_) => {
                warn!(topic, "Event dropped (no consumers for topic)");
                0
            }
        }
    }

    /// Create an unsubscribed consumer bound to this bus.
    pub fn consumer(self: &Arc<Self>) -> BusConsumer {
        BusConsumer {
            bus: Arc::clone(self),
            receiver: None,
        }
    }

    /// Drop the topic's channel. Its consumers observe a disconnect.
    pub fn close_topic(&self, topic: &str) -> bool {
        self.topics.write().remove(topic).is_some()
    }

    /// Number of consumers currently subscribed to `topic`.
    pub fn consumer_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    fn receiver(&self, topic: &str) -> broadcast::Receiver<RawEvent> {
        if let Some(sender) = self.topics.read().get(topic) {
            return sender.subscribe();
        }

        self.topics
            .write()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }
}

impl Default for InMemoryLogBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscription to an [`InMemoryLogBus`] topic.
pub struct BusConsumer {
    bus: Arc<InMemoryLogBus>,
    receiver: Option<broadcast::Receiver<RawEvent>>,
}

#[async_trait]
impl EventSource for BusConsumer {
    async fn subscribe(&mut self, topic: &str) -> Result<(), SourceError> {
        if topic.is_empty() {
            return Err(SourceError::Transport("empty topic name".into()));
        }
        self.receiver = Some(self.bus.receiver(topic));
        debug!(topic, "Subscribed to in-memory bus");
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<RawEvent>, SourceError> {
        let receiver = self.receiver.as_mut().ok_or(SourceError::NotSubscribed)?;

        match tokio::time::timeout(timeout, receiver.recv()).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok(event)) => Ok(Some(event)),
            Ok(Err(RecvError::Lagged(skipped))) => Err(SourceError::Lagged(skipped)),
            Ok(Err(RecvError::Closed)) => Err(SourceError::Disconnected),
        }
    }
}
