//! Connection pump: moves one viewer's traffic between the hub and its peer.
//!
//! ```text
//!            outbound queue            Sink<Frame>
//!   hub ───────────────▶ write side ───────────────▶ peer
//!                            ▲ closing
//!                            │
//!   hub ◀── leave ──── read side ◀─────────────────── peer
//!                                   Stream<Result<Frame>>
//! ```
//!
//! The read side runs on the caller's task and the write side on its own.
//! Whichever stops first ends the other; the hub is told via `leave` and the
//! connection ends `Closed`.

use std::fmt::Display;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::{ConnectionId, ConnectionState, Frame, PumpConfig};
use crate::hub::{Connection, HubHandle};

/// Why a pump stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpExit {
    /// Peer sent a close frame.
    PeerClosed,
    /// Peer stream ended without a close frame.
    PeerGone,
    /// Reading from the peer failed.
    ReadFailed(String),
    /// Nothing arrived from the peer within the idle timeout.
    IdleTimeout,
    /// Writing to the peer failed.
    WriteFailed(String),
    /// The hub released the connection (eviction or shutdown).
    HubReleased,
}

enum WriteExit {
    Stopped,
    HubReleased,
    Failed(String),
}

/// Runs connections against a hub.
#[derive(Clone)]
pub struct ConnectionPump {
    hub: HubHandle,
    config: PumpConfig,
}

impl ConnectionPump {
    pub fn new(hub: HubHandle, config: PumpConfig) -> Self {
        Self { hub, config }
    }

    /// Pump `connection` until either side stops, then leave the hub.
    pub async fn run<S, R, E>(&self, connection: Connection, sink: S, mut stream: R) -> PumpExit
    where
        S: Sink<Frame> + Send + Unpin + 'static,
        S::Error: Display + Send,
        R: Stream<Item = Result<Frame, E>> + Unpin,
        E: Display,
    {
        let (id, outbound, lifecycle) = connection.into_parts();
        let (closing_tx, closing_rx) = watch::channel(false);
        let mut writer: JoinHandle<WriteExit> = tokio::spawn(write_loop(
            id,
            sink,
            outbound,
            closing_rx,
            self.config.ping_interval,
        ));

        let exit = loop {
            tokio::select! {
                written = &mut writer => {
                    break match written {
                        Ok(WriteExit::Failed(e)) => PumpExit::WriteFailed(e),
                        Ok(WriteExit::HubReleased) | Ok(WriteExit::Stopped) => PumpExit::HubReleased,
                        Err(e) => PumpExit::WriteFailed(e.to_string()),
                    };
                }
                inbound = tokio::time::timeout(self.config.idle_timeout, stream.next()) => {
                    match inbound {
                        Err(_) => break PumpExit::IdleTimeout,
                        Ok(None) => break PumpExit::PeerGone,
                        Ok(Some(Err(e))) => break PumpExit::ReadFailed(e.to_string()),
                        Ok(Some(Ok(Frame::Close))) => break PumpExit::PeerClosed,
                        // Viewers are read-only; any frame only proves liveness.
                        Ok(Some(Ok(_))) => continue,
                    }
                }
            }
        };

        lifecycle.advance(ConnectionState::Closing);

        if !writer.is_finished() {
            let _ = closing_tx.send(true);
            match tokio::time::timeout(self.config.close_grace, &mut writer).await {
                Ok(_) => {}
                Err(_) => {
                    debug!(connection_id = %id, "Write side exceeded close grace, aborting");
                    writer.abort();
                }
            }
        }

        self.hub.leave(id).await;
        lifecycle.advance(ConnectionState::Closed);

        match &exit {
            PumpExit::ReadFailed(e) | PumpExit::WriteFailed(e) => {
                warn!(connection_id = %id, error = %e, "Viewer connection failed")
            }
            other => info!(connection_id = %id, reason = ?other, "Viewer disconnected"),
        }
        exit
    }
}

async fn write_loop<S>(
    id: ConnectionId,
    mut sink: S,
    mut outbound: mpsc::Receiver<Bytes>,
    mut closing: watch::Receiver<bool>,
    ping_interval: std::time::Duration,
) -> WriteExit
where
    S: Sink<Frame> + Unpin,
    S::Error: Display + Send,
{
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let exit = loop {
        tokio::select! {
            biased;
            _ = closing.changed() => {
                // Flush what the hub already enqueued.
                while let Ok(payload) = outbound.try_recv() {
                    if let Err(e) = sink.send(Frame::Payload(payload)).await {
                        return WriteExit::Failed(e.to_string());
                    }
                }
                break WriteExit::Stopped;
            }
            payload = outbound.recv() => match payload {
                Some(payload) => {
                    if let Err(e) = sink.send(Frame::Payload(payload)).await {
                        return WriteExit::Failed(e.to_string());
                    }
                }
                None => break WriteExit::HubReleased,
            },
            _ = ping.tick() => {
                if let Err(e) = sink.send(Frame::Ping(Bytes::new())).await {
                    return WriteExit::Failed(e.to_string());
                }
            }
        }
    };

    if let Err(e) = sink.send(Frame::Close).await {
        debug!(connection_id = %id, error = %e, "Close frame not delivered");
    }
    let _ = sink.close().await;
    exit
}
