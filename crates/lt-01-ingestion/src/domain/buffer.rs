//! Fixed-capacity, drop-oldest event buffer.
//!
//! The buffer is the only state shared between the ingestion loop (append)
//! and the flush scheduler (drain). Both operations take the same lock, so
//! a drain observes either all or none of any concurrent append.
//!
//! ```text
//! capacity = 3
//! append e1, e2, e3   → [e1, e2, e3]
//! append e4           → [e2, e3, e4]   (e1 evicted)
//! drain_all           → returns [e2, e3, e4], buffer = []
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::event::RawEvent;

/// Bounded FIFO of pending raw events.
pub struct BoundedBuffer {
    events: Mutex<VecDeque<RawEvent>>,
    capacity: usize,
    evicted: AtomicU64,
}

impl BoundedBuffer {
    /// Create a buffer holding at most `capacity` events.
    ///
    /// A zero capacity is raised to one; configuration validation rejects it
    /// before it reaches here.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            evicted: AtomicU64::new(0),
        }
    }

    /// Append at the back, evicting the front element when full.
    ///
    /// Returns the evicted event, if any.
    pub fn append(&self, event: RawEvent) -> Option<RawEvent> {
        let mut events = self.events.lock();
        let evicted = if events.len() >= self.capacity {
            events.pop_front()
        } else {
            None
        };
        events.push_back(event);

        if evicted.is_some() {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        evicted
    }

    /// Take the entire contents in arrival order, leaving the buffer empty.
    pub fn drain_all(&self) -> Vec<RawEvent> {
        let mut events = self.events.lock();
        let drained = std::mem::replace(&mut *events, VecDeque::with_capacity(self.capacity));
        drop(events);
        Vec::from(drained)
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events lost to the drop-oldest policy since creation.
    pub fn evicted_total(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}
