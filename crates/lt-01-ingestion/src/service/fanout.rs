//! Sink fan-out: one batch → log sink + live broadcast.

use std::sync::Arc;

use lt_telemetry::{HistogramTimer, BATCHES_FLUSHED, EVENTS_FLUSHED, FLUSH_DURATION, SINK_FAILURES};
use tracing::{debug, warn};

use crate::domain::Batch;
use crate::ports::{LiveBroadcast, LogSink};

/// Result of dispatching one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub forwarded: usize,
    pub sink_failures: usize,
}

/// Forwards each event of a batch, in order, to both destinations.
#[derive(Clone)]
pub struct SinkFanout {
    sink: Arc<dyn LogSink>,
    live: Arc<dyn LiveBroadcast>,
}

impl SinkFanout {
    pub fn new(sink: Arc<dyn LogSink>, live: Arc<dyn LiveBroadcast>) -> Self {
        Self { sink, live }
    }

    /// Dispatch every event of `batch`.
    ///
    /// A sink failure is logged and counted; it neither skips the live
    /// broadcast of that event nor stops the rest of the batch.
    pub async fn dispatch(&self, batch: &Batch) -> DispatchOutcome {
        let _timer = HistogramTimer::new(&FLUSH_DURATION);
        let mut outcome = DispatchOutcome::default();

        for event in batch.events() {
            debug!(batch = batch.sequence(), bytes = event.len(), "Dispatching event");

            match self.sink.forward(event).await {
                Ok(()) => outcome.forwarded += 1,
                Err(e) => {
                    outcome.sink_failures += 1;
                    SINK_FAILURES.inc();
                    warn!(sink = self.sink.name(), error = %e, "Log sink rejected event");
                }
            }

            self.live.broadcast(event.payload().clone()).await;
        }

        BATCHES_FLUSHED.inc();
        EVENTS_FLUSHED.inc_by(batch.len() as f64);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawEvent;
    use crate::ports::mock::{as_strings, RecordingBroadcast, RecordingSink};

    fn batch(names: &[&'static str]) -> Batch {
        Batch::new(1, names.iter().map(|n| RawEvent::new(*n)).collect(), false)
    }

    #[tokio::test]
    async fn test_events_reach_both_destinations_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let live = Arc::new(RecordingBroadcast::default());
        let fanout = SinkFanout::new(sink.clone(), live.clone());

        let outcome = fanout.dispatch(&batch(&["e1", "e2", "e3"])).await;

        assert_eq!(outcome.forwarded, 3);
        assert_eq!(as_strings(&sink.forwarded.lock()), vec!["e1", "e2", "e3"]);
        assert_eq!(as_strings(&live.delivered.lock()), vec!["e1", "e2", "e3"]);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_stop_batch() {
        let sink = Arc::new(RecordingSink {
            reject: vec!["e2"],
            ..Default::default()
        });
        let live = Arc::new(RecordingBroadcast::default());
        let fanout = SinkFanout::new(sink.clone(), live.clone());

        let outcome = fanout.dispatch(&batch(&["e1", "e2", "e3"])).await;

        assert_eq!(outcome.sink_failures, 1);
        assert_eq!(as_strings(&sink.forwarded.lock()), vec!["e1", "e3"]);
        // The rejected event is still broadcast.
        assert_eq!(as_strings(&live.delivered.lock()), vec!["e1", "e2", "e3"]);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_forwarded_unchanged() {
        let sink = Arc::new(RecordingSink::default());
        let live = Arc::new(RecordingBroadcast::default());
        let fanout = SinkFanout::new(sink.clone(), live.clone());

        fanout.dispatch(&batch(&["{not json"])).await;

        assert_eq!(as_strings(&sink.forwarded.lock()), vec!["{not json"]);
    }

    #[tokio::test]
    async fn test_binary_payload_shared_with_both_destinations() {
        let sink = Arc::new(RecordingSink::default());
        let live = Arc::new(RecordingBroadcast::default());
        let fanout = SinkFanout::new(sink.clone(), live.clone());

        let payload = bytes::Bytes::from_static(&[0xff, 0x00, 0xfe]);
        let batch = Batch::new(1, vec![RawEvent::new(payload.clone())], false);
        let outcome = fanout.dispatch(&batch).await;

        assert_eq!(outcome.forwarded, 1);
        let forwarded = sink.forwarded.lock()[0].clone();
        let delivered = live.delivered.lock()[0].clone();
        assert_eq!(forwarded, payload);
        assert_eq!(delivered.as_ptr(), payload.as_ptr());
    }
}
