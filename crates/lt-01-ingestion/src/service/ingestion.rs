//! Ingestion loop: event source → bounded buffer.

use std::sync::Arc;
use std::time::Duration;

use lt_telemetry::{BUFFER_DEPTH, EVENTS_EVICTED, EVENTS_INGESTED, SOURCE_ERRORS};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::BoundedBuffer;
use crate::ports::EventSource;

/// Totals reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub ingested: u64,
    pub evicted: u64,
    pub source_errors: u64,
}

/// Polls one subscribed source until shutdown is signalled.
pub struct IngestionLoop<S> {
    source: S,
    buffer: Arc<BoundedBuffer>,
    poll_timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<S: EventSource> IngestionLoop<S> {
    pub fn new(
        source: S,
        buffer: Arc<BoundedBuffer>,
        poll_timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            buffer,
            poll_timeout,
            shutdown,
        }
    }

    /// Run until shutdown. The signal is checked between polls, so exit
    /// latency is bounded by one poll timeout.
    pub async fn run(mut self) -> IngestionReport {
        let mut report = IngestionReport::default();

        while !self.shutdown_requested() {
            match self.source.poll(self.poll_timeout).await {
                Ok(Some(event)) => {
                    report.ingested += 1;
                    EVENTS_INGESTED.inc();

                    if let Some(evicted) = self.buffer.append(event) {
                        report.evicted += 1;
                        EVENTS_EVICTED.inc();
                        debug!(
                            evicted_bytes = evicted.len(),
                            capacity = self.buffer.capacity(),
                            "Buffer full, dropped oldest event"
                        );
                    }
                    BUFFER_DEPTH.set(self.buffer.len() as f64);
                }
                Ok(None) => {}
                Err(e) => {
                    report.source_errors += 1;
                    SOURCE_ERRORS.inc();
                    warn!(error = %e, "Event source poll failed");
                    self.backoff().await;
                }
            }
        }

        info!(
            ingested = report.ingested,
            evicted = report.evicted,
            source_errors = report.source_errors,
            "Ingestion loop stopped"
        );
        report
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    /// Wait one poll timeout, or less if shutdown arrives first.
    async fn backoff(&mut self) {
        tokio::select! {
            _ = tokio::time::sleep(self.poll_timeout) => {}
            _ = self.shutdown.changed() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceError;
    use crate::ports::mock::{ScriptedSource, Step};
    use std::sync::atomic::Ordering;

    const POLL: Duration = Duration::from_millis(100);

    fn drained(buffer: &BoundedBuffer) -> Vec<String> {
        buffer
            .drain_all()
            .iter()
            .map(|e| String::from_utf8_lossy(e.payload()).into_owned())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_appended_in_order() {
        let buffer = Arc::new(BoundedBuffer::new(10));
        let (tx, rx) = watch::channel(false);
        let source = ScriptedSource::new(vec![
            Step::Event("e1"),
            Step::Timeout,
            Step::Event("e2"),
        ]);

        let task = tokio::spawn(IngestionLoop::new(source, Arc::clone(&buffer), POLL, rx).run());
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();

        let report = task.await.unwrap();
        assert_eq!(report.ingested, 2);
        assert_eq!(drained(&buffer), vec!["e1", "e2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_counts_evictions() {
        let buffer = Arc::new(BoundedBuffer::new(3));
        let (tx, rx) = watch::channel(false);
        let source = ScriptedSource::new(vec![
            Step::Event("e1"),
            Step::Event("e2"),
            Step::Event("e3"),
            Step::Event("e4"),
        ]);

        let task = tokio::spawn(IngestionLoop::new(source, Arc::clone(&buffer), POLL, rx).run());
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();

        let report = task.await.unwrap();
        assert_eq!(report.evicted, 1);
        assert_eq!(drained(&buffer), vec!["e2", "e3", "e4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_errors_do_not_stop_loop() {
        let buffer = Arc::new(BoundedBuffer::new(10));
        let (tx, rx) = watch::channel(false);
        let source = ScriptedSource::new(vec![
            Step::Fail(SourceError::Transport("broker unavailable".into())),
            Step::Fail(SourceError::Lagged(3)),
            Step::Event("after-errors"),
        ]);

        let task = tokio::spawn(IngestionLoop::new(source, Arc::clone(&buffer), POLL, rx).run());
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();

        let report = task.await.unwrap();
        assert_eq!(report.source_errors, 2);
        assert_eq!(drained(&buffer), vec!["after-errors"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_backoff_limits_poll_rate() {
        let buffer = Arc::new(BoundedBuffer::new(10));
        let (tx, rx) = watch::channel(false);
        let steps = (0..100)
            .map(|_| Step::Fail(SourceError::Disconnected))
            .collect();
        let source = ScriptedSource::new(steps);
        let polls = Arc::clone(&source.polls);

        let task = tokio::spawn(IngestionLoop::new(source, buffer, POLL, rx).run());
        // Ten backoff periods, plus slack for the first poll.
        tokio::time::sleep(Duration::from_millis(1_050)).await;
        tx.send(true).unwrap();
        task.await.unwrap();

        let polls = polls.load(Ordering::SeqCst);
        assert!((10..=12).contains(&polls), "polled {polls} times");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_sender_dropped() {
        let buffer = Arc::new(BoundedBuffer::new(10));
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let report = IngestionLoop::new(ScriptedSource::new(vec![]), buffer, POLL, rx)
            .run()
            .await;
        assert_eq!(report, IngestionReport::default());
    }
}
