//! The hub actor: sole owner of the connection registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use lt_telemetry::{BROADCAST_DELIVERIES, BROADCAST_DROPPED, LIVE_CONNECTIONS};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::handle::{BroadcastOutcome, Connection};
use crate::domain::{ConnectionId, ConnectionState, HubError, Lifecycle};

pub(crate) enum Command {
    Join {
        queue_capacity: usize,
        reply: oneshot::Sender<Result<Connection, HubError>>,
    },
    Leave {
        id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    Broadcast {
        payload: Bytes,
        reply: oneshot::Sender<BroadcastOutcome>,
    },
    Shutdown {
        reply: oneshot::Sender<usize>,
    },
}

struct Registered {
    outbound: mpsc::Sender<Bytes>,
    lifecycle: Lifecycle,
}

pub(crate) struct HubActor {
    commands: mpsc::Receiver<Command>,
    registry: HashMap<ConnectionId, Registered>,
    count: Arc<AtomicUsize>,
    accepting: Arc<AtomicBool>,
}

impl HubActor {
    pub(crate) fn new(
        commands: mpsc::Receiver<Command>,
        count: Arc<AtomicUsize>,
        accepting: Arc<AtomicBool>,
    ) -> Self {
        Self {
            commands,
            registry: HashMap::new(),
            count,
            accepting,
        }
    }

    pub(crate) async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Join {
                    queue_capacity,
                    reply,
                } => {
                    let _ = reply.send(Ok(self.join(queue_capacity)));
                }
                Command::Leave { id, reply } => {
                    let _ = reply.send(self.leave(id));
                }
                Command::Broadcast { payload, reply } => {
                    let _ = reply.send(self.broadcast(payload));
                }
                Command::Shutdown { reply } => {
                    self.accepting.store(false, Ordering::Release);
                    self.commands.close();
                    let closed = self.close_all();
                    let _ = reply.send(closed);
                    break;
                }
            }
        }

        self.accepting.store(false, Ordering::Release);
        self.commands.close();
        // Answer whatever was queued before the queue closed.
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Join { reply, .. } => {
                    let _ = reply.send(Err(HubError::ShuttingDown));
                }
                Command::Leave { reply, .. } => {
                    let _ = reply.send(false);
                }
                Command::Broadcast { reply, .. } => {
                    let _ = reply.send(BroadcastOutcome::default());
                }
                Command::Shutdown { reply } => {
                    let _ = reply.send(0);
                }
            }
        }
        self.close_all();
        info!("Live hub stopped");
    }

    fn join(&mut self, queue_capacity: usize) -> Connection {
        let id = ConnectionId::new();
        let (outbound, receiver) = mpsc::channel(queue_capacity.max(1));
        let lifecycle = Lifecycle::new();
        lifecycle.advance(ConnectionState::Active);

        self.registry.insert(
            id,
            Registered {
                outbound,
                lifecycle: lifecycle.clone(),
            },
        );
        self.sync_count();
        info!(connection_id = %id, clients = self.registry.len(), "Viewer joined");

        Connection::new(id, receiver, lifecycle)
    }

    fn leave(&mut self, id: ConnectionId) -> bool {
        match self.registry.remove(&id) {
            Some(entry) => {
                entry.lifecycle.advance(ConnectionState::Closing);
                self.sync_count();
                info!(connection_id = %id, clients = self.registry.len(), "Viewer left");
                true
            }
            None => false,
        }
    }

    fn broadcast(&mut self, payload: Bytes) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();
        let mut evicted = Vec::new();

        for (id, entry) in &self.registry {
            if entry.lifecycle.state().is_terminating() {
                evicted.push(*id);
                continue;
            }
            match entry.outbound.try_send(payload.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(connection_id = %id, "Viewer queue full, disconnecting slow consumer");
                    evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(connection_id = %id, "Viewer queue closed");
                    evicted.push(*id);
                }
            }
        }

        for id in evicted {
            if let Some(entry) = self.registry.remove(&id) {
                entry.lifecycle.advance(ConnectionState::Closing);
            }
            outcome.dropped += 1;
        }

        BROADCAST_DELIVERIES.inc_by(outcome.delivered as f64);
        BROADCAST_DROPPED.inc_by(outcome.dropped as f64);
        if outcome.dropped > 0 {
            self.sync_count();
        }
        outcome
    }

    /// Mark every registered connection closing and drop its sender.
    fn close_all(&mut self) -> usize {
        let closed = self.registry.len();
        for (_, entry) in self.registry.drain() {
            entry.lifecycle.advance(ConnectionState::Closing);
        }
        self.sync_count();
        closed
    }

    fn sync_count(&self) {
        self.count.store(self.registry.len(), Ordering::Release);
        LIVE_CONNECTIONS.set(self.registry.len() as f64);
    }
}
