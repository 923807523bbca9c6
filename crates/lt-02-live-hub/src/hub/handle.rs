//! Cloneable handle to the hub actor.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use super::actor::{Command, HubActor};
use crate::domain::{ConnectionId, ConnectionState, HubConfig, HubError, Lifecycle};

/// Result of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Connections the payload was enqueued for.
    pub delivered: usize,
    /// Connections evicted instead of receiving it.
    pub dropped: usize,
}

/// A registered viewer as seen by its pump.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::Receiver<Bytes>,
    lifecycle: Lifecycle,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, outbound: mpsc::Receiver<Bytes>, lifecycle: Lifecycle) -> Self {
        Self {
            id,
            outbound,
            lifecycle,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Next payload enqueued for this connection, or `None` once the hub has
    /// released it and the queue is empty.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.outbound.recv().await
    }

    pub(crate) fn into_parts(self) -> (ConnectionId, mpsc::Receiver<Bytes>, Lifecycle) {
        (self.id, self.outbound, self.lifecycle)
    }
}

/// Entry point for starting the hub.
pub struct BroadcastHub;

impl BroadcastHub {
    /// Spawn the hub actor on the current runtime.
    pub fn spawn(config: HubConfig) -> HubHandle {
        let (commands, receiver) = mpsc::channel(config.command_capacity.max(1));
        let count = Arc::new(AtomicUsize::new(0));
        let accepting = Arc::new(AtomicBool::new(true));

        tokio::spawn(HubActor::new(receiver, Arc::clone(&count), Arc::clone(&accepting)).run());
        info!(queue_capacity = config.queue_capacity, "Live hub started");

        HubHandle {
            commands,
            count,
            accepting,
            queue_capacity: config.queue_capacity,
        }
    }
}

/// Cloneable access to the hub actor.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<Command>,
    count: Arc<AtomicUsize>,
    accepting: Arc<AtomicBool>,
    queue_capacity: usize,
}

impl HubHandle {
    /// Register a new connection. It receives broadcasts issued after this
    /// call returns, and none issued before.
    pub async fn join(&self) -> Result<Connection, HubError> {
        if !self.is_accepting() {
            return Err(HubError::ShuttingDown);
        }

        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Join {
                queue_capacity: self.queue_capacity,
                reply,
            })
            .await
            .map_err(|_| self.stopped())?;
        response.await.map_err(|_| self.stopped())?
    }

    /// Remove a connection. Returns whether it was still registered.
    pub async fn leave(&self, id: ConnectionId) -> bool {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Leave { id, reply }).await.is_err() {
            return false;
        }
        response.await.unwrap_or(false)
    }

    /// Enqueue `payload` for every connection registered right now.
    pub async fn broadcast(&self, payload: Bytes) -> Result<BroadcastOutcome, HubError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Broadcast { payload, reply })
            .await
            .map_err(|_| self.stopped())?;
        response.await.map_err(|_| self.stopped())
    }

    /// Refuse new joins while existing connections keep receiving broadcasts.
    ///
    /// [`HubHandle::shutdown`] later closes what is left.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    /// Stop accepting joins, close every connection and stop the actor.
    ///
    /// Returns the number of connections that were closed.
    pub async fn shutdown(&self) -> usize {
        self.accepting.store(false, Ordering::Release);

        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).await.is_err() {
            return 0;
        }
        response.await.unwrap_or(0)
    }

    /// Registry size, readable without a round trip to the actor.
    pub fn connection_count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    fn stopped(&self) -> HubError {
        if self.is_accepting() {
            HubError::HubStopped
        } else {
            HubError::ShuttingDown
        }
    }
}
