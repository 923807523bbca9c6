//! Pipeline service: wires the ingestion loop and the flush scheduler.
//!
//! ```text
//!  EventSource ──poll──▶ IngestionLoop ──append──▶ BoundedBuffer
//!                                                      │ drain_all (every T)
//!                                                      ▼
//!                        LogSink ◀──forward── SinkFanout ◀── FlushScheduler
//!                        LiveBroadcast ◀──broadcast──┘
//! ```
//!
//! Shutdown stops ingestion first and only then releases the scheduler, so
//! the final drain sees every event the loop ever appended.

pub mod fanout;
pub mod flush;
pub mod ingestion;

pub use fanout::{DispatchOutcome, SinkFanout};
pub use flush::{FlushReport, FlushScheduler};
pub use ingestion::{IngestionLoop, IngestionReport};

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::domain::{BoundedBuffer, PipelineConfig, PipelineError};
use crate::ports::{EventSource, LiveBroadcast, LogSink};

/// Entry point for starting the pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Validate `config`, subscribe `source` and spawn both activities.
    ///
    /// A failed subscribe is fatal and nothing is spawned.
    pub async fn start<S>(
        config: PipelineConfig,
        mut source: S,
        sink: Arc<dyn LogSink>,
        live: Arc<dyn LiveBroadcast>,
    ) -> Result<PipelineHandle, PipelineError>
    where
        S: EventSource + 'static,
    {
        config.validate()?;
        source
            .subscribe(&config.topic)
            .await
            .map_err(PipelineError::Subscribe)?;

        info!(
            topic = %config.topic,
            capacity = config.buffer_capacity,
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            sink = sink.name(),
            "Ingestion pipeline started"
        );

        let buffer = Arc::new(BoundedBuffer::new(config.buffer_capacity));
        let (ingest_tx, ingest_rx) = watch::channel(false);
        let (flush_tx, flush_rx) = watch::channel(false);

        let ingestion = tokio::spawn(
            IngestionLoop::new(source, Arc::clone(&buffer), config.poll_timeout, ingest_rx).run(),
        );
        let flusher = tokio::spawn(
            FlushScheduler::new(
                Arc::clone(&buffer),
                SinkFanout::new(sink, live),
                config.flush_interval,
                flush_rx,
            )
            .run(),
        );

        Ok(PipelineHandle {
            buffer,
            ingest_tx,
            flush_tx,
            ingestion,
            flusher,
        })
    }
}

/// Totals from both activities, returned by [`PipelineHandle::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub ingestion: IngestionReport,
    pub flush: FlushReport,
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    buffer: Arc<BoundedBuffer>,
    ingest_tx: watch::Sender<bool>,
    flush_tx: watch::Sender<bool>,
    ingestion: JoinHandle<IngestionReport>,
    flusher: JoinHandle<FlushReport>,
}

impl PipelineHandle {
    /// Shared buffer, for inspection.
    pub fn buffer(&self) -> &Arc<BoundedBuffer> {
        &self.buffer
    }

    /// Stop ingestion, wait for it, then run the final flush and wait for it.
    pub async fn shutdown(self) -> PipelineReport {
        let _ = self.ingest_tx.send(true);
        let ingestion = match self.ingestion.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Ingestion task failed");
                IngestionReport::default()
            }
        };

        let _ = self.flush_tx.send(true);
        let flush = match self.flusher.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Flush task failed");
                FlushReport::default()
            }
        };

        PipelineReport { ingestion, flush }
    }
}
