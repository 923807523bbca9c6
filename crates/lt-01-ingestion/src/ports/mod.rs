//! Ports layer for the ingestion pipeline.
//!
//! Only outbound (driven) ports exist here: the pipeline is driven by its own
//! tasks, and its one inbound surface is [`crate::service::PipelineHandle`].

pub mod outbound;

pub use outbound::*;
