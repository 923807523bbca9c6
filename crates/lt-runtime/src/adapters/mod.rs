//! Adapters connecting the ingestion pipeline to the live hub.

mod live_hub;

pub use live_hub::HubBroadcastAdapter;
