//! Flush scheduler: periodic drain of the buffer into batches.

use std::sync::Arc;
use std::time::Duration;

use lt_telemetry::BUFFER_DEPTH;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::fanout::SinkFanout;
use crate::domain::{Batch, BoundedBuffer};

/// Totals reported when the scheduler exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Non-empty batches dispatched, including the final one.
    pub batches: u64,
    pub events: u64,
    pub sink_failures: u64,
}

/// Drains the buffer every `interval`, and once more when stopped.
pub struct FlushScheduler {
    buffer: Arc<BoundedBuffer>,
    fanout: SinkFanout,
    interval: Duration,
    stop: watch::Receiver<bool>,
    next_sequence: u64,
    report: FlushReport,
}

impl FlushScheduler {
    pub fn new(
        buffer: Arc<BoundedBuffer>,
        fanout: SinkFanout,
        interval: Duration,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            buffer,
            fanout,
            interval,
            stop,
            next_sequence: 1,
            report: FlushReport::default(),
        }
    }

    pub async fn run(mut self) -> FlushReport {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stop = self.stop.clone();

        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => self.flush(false).await,
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.flush(true).await;
        info!(
            batches = self.report.batches,
            events = self.report.events,
            sink_failures = self.report.sink_failures,
            "Flush scheduler stopped after final flush"
        );
        self.report
    }

    async fn flush(&mut self, is_final: bool) {
        let events = self.buffer.drain_all();
        BUFFER_DEPTH.set(0.0);

        if events.is_empty() {
            debug!(is_final, "Nothing to flush");
            return;
        }

        let batch = Batch::new(self.next_sequence, events, is_final);
        self.next_sequence += 1;
        info!(
            batch = batch.sequence(),
            is_final,
            "Processing {} logs in batch",
            batch.len()
        );

        let outcome = self.fanout.dispatch(&batch).await;
        self.report.batches += 1;
        self.report.events += batch.len() as u64;
        self.report.sink_failures += outcome.sink_failures as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawEvent;
    use crate::ports::mock::{as_strings, RecordingBroadcast, RecordingSink};

    const INTERVAL: Duration = Duration::from_secs(3);

    struct Harness {
        buffer: Arc<BoundedBuffer>,
        sink: Arc<RecordingSink>,
        stop: watch::Sender<bool>,
        task: tokio::task::JoinHandle<FlushReport>,
    }

    fn start(capacity: usize) -> Harness {
        let buffer = Arc::new(BoundedBuffer::new(capacity));
        let sink = Arc::new(RecordingSink::default());
        let fanout = SinkFanout::new(sink.clone(), Arc::new(RecordingBroadcast::default()));
        let (stop, rx) = watch::channel(false);
        let task = tokio::spawn(FlushScheduler::new(Arc::clone(&buffer), fanout, INTERVAL, rx).run());
        Harness {
            buffer,
            sink,
            stop,
            task,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_flush_forwards_batch_in_order() {
        let h = start(10);
        h.buffer.append(RawEvent::new("e1"));
        h.buffer.append(RawEvent::new("e2"));

        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;

        assert_eq!(as_strings(&h.sink.forwarded.lock()), vec!["e1", "e2"]);
        assert!(h.buffer.is_empty());

        h.stop.send(true).unwrap();
        let report = h.task.await.unwrap();
        assert_eq!(report.batches, 1);
        assert_eq!(report.events, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_flush_before_first_interval() {
        let h = start(10);
        h.buffer.append(RawEvent::new("e1"));

        tokio::time::sleep(INTERVAL - Duration::from_millis(10)).await;
        assert!(h.sink.forwarded.lock().is_empty());
        assert_eq!(h.buffer.len(), 1);

        h.stop.send(true).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_ticks_produce_no_batches() {
        let h = start(10);
        tokio::time::sleep(INTERVAL * 4).await;
        h.stop.send(true).unwrap();

        let report = h.task.await.unwrap();
        assert_eq!(report.batches, 0);
        assert!(h.sink.forwarded.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending_exactly_once() {
        let h = start(10);
        h.buffer.append(RawEvent::new("e5"));

        h.stop.send(true).unwrap();
        let report = h.task.await.unwrap();

        assert_eq!(as_strings(&h.sink.forwarded.lock()), vec!["e5"]);
        assert_eq!(report.batches, 1);

        // Nothing flushes after the scheduler has exited.
        h.buffer.append(RawEvent::new("late"));
        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(h.sink.forwarded.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_split_across_intervals() {
        let h = start(10);
        h.buffer.append(RawEvent::new("e1"));
        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
        h.buffer.append(RawEvent::new("e2"));
        tokio::time::sleep(INTERVAL).await;

        h.stop.send(true).unwrap();
        let report = h.task.await.unwrap();

        assert_eq!(report.batches, 2);
        assert_eq!(as_strings(&h.sink.forwarded.lock()), vec!["e1", "e2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_stop_sender_still_flushes() {
        let h = start(10);
        h.buffer.append(RawEvent::new("e1"));
        drop(h.stop);

        let report = h.task.await.unwrap();
        assert_eq!(report.events, 1);
    }
}
