//! `LiveBroadcast` backed by the hub actor.

use async_trait::async_trait;
use bytes::Bytes;
use lt_01_ingestion::LiveBroadcast;
use lt_02_live_hub::HubHandle;
use tracing::{debug, warn};

/// Forwards flushed payloads to every connected viewer.
#[derive(Clone)]
pub struct HubBroadcastAdapter {
    hub: HubHandle,
}

impl HubBroadcastAdapter {
    pub fn new(hub: HubHandle) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl LiveBroadcast for HubBroadcastAdapter {
    async fn broadcast(&self, payload: Bytes) {
        match self.hub.broadcast(payload).await {
            Ok(outcome) if outcome.dropped > 0 => {
                debug!(
                    delivered = outcome.delivered,
                    dropped = outcome.dropped,
                    "Broadcast evicted viewers"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Live broadcast skipped"),
        }
    }
}
