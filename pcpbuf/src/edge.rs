use crate::{
    common::likely,
    monitor::Monitor,
    ringbuf::{Insert, RingBuf},
    shutdown::Shutdown,
    PcpBufError,
};
use std::time::{Duration, Instant};
use tracing::trace;

/// A bounded ring buffer paired with its monitor: one pipeline connection
/// from a producer role to a consumer role.
///
/// `push` blocks while the buffer is full and `pop` blocks while it is
/// empty. Both re-check their condition after every wake-up and give up
/// once the shared [`Shutdown`] flag is cleared, so a peer that has already
/// left can never strand them.
pub struct Edge<T> {
    name: &'static str,
    monitor: Monitor<RingBuf<T>>,
}

impl<T> Edge<T> {
    pub fn new(name: &'static str, capacity: usize) -> Result<Self, PcpBufError> {
        Ok(Edge {
            name,
            monitor: Monitor::new(RingBuf::new(capacity)?),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.monitor.lock().capacity()
    }

    pub fn len(&self) -> usize {
        self.monitor.lock().read_available()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand `value` to the consumer, waiting for room if necessary.
    ///
    /// Returns the value back if the pipeline stopped before room appeared.
    pub fn push(&self, value: T, shutdown: &Shutdown) -> Result<(), T> {
        let mut guard = self.monitor.lock();
        let mut pending = value;
        loop {
            match guard.insert_single(pending) {
                Insert::Inserted => break,
                Insert::Full(rejected) => {
                    if !shutdown.is_running() {
                        trace!(edge = self.name, "push abandoned on shutdown");
                        return Err(rejected);
                    }
                    pending = rejected;
                    guard.wait_for_consumer();
                }
            }
        }
        guard.notify_consumer();
        Ok(())
    }

    /// Take the oldest value, waiting for one if necessary.
    ///
    /// Returns `None` if the pipeline stopped while the edge was empty.
    pub fn pop(&self, shutdown: &Shutdown) -> Option<T> {
        let mut guard = self.monitor.lock();
        let value = loop {
            if let Some(value) = guard.remove_single() {
                break value;
            }
            if !shutdown.is_running() {
                trace!(edge = self.name, "pop abandoned on shutdown");
                return None;
            }
            guard.wait_for_producer();
        };
        guard.notify_producer();
        Some(value)
    }

    /// Like [`pop`](Self::pop) but bounded by `timeout` instead of the
    /// shutdown flag.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.monitor.lock();
        let value = loop {
            if let Some(value) = guard.remove_single() {
                break value;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            guard.timed_wait_for_producer(deadline - now);
        };
        guard.notify_producer();
        Some(value)
    }

    /// Non-blocking insert.
    pub fn try_push(&self, value: T) -> Insert<T> {
        let mut guard = self.monitor.lock();
        let outcome = guard.insert_single(value);
        if likely(outcome.is_inserted()) {
            guard.notify_consumer();
        }
        outcome
    }

    /// Producer-side shutdown: insert `filler` (discarded if there is no
    /// room) and wake every parked consumer.
    pub fn release_consumer(&self, filler: T) {
        let mut guard = self.monitor.lock();
        let inserted = guard.insert_single(filler).is_inserted();
        guard.notify_all_consumers();
        trace!(edge = self.name, inserted, "released consumers");
    }

    /// Consumer-side shutdown: remove one value and wake every parked
    /// producer. The removed value, if any, is returned to the caller.
    pub fn release_producer(&self) -> Option<T> {
        let mut guard = self.monitor.lock();
        let removed = guard.remove_single();
        guard.notify_all_producers();
        trace!(
            edge = self.name,
            removed = removed.is_some(),
            "released producers"
        );
        removed
    }

    /// Wake every parked consumer without touching the contents.
    pub fn wake_consumers(&self) {
        let _guard = self.monitor.lock();
        self.monitor.notify_all_consumers();
    }

    /// Wake every parked producer without touching the contents.
    pub fn wake_producers(&self) {
        let _guard = self.monitor.lock();
        self.monitor.notify_all_producers();
    }

    /// Take everything still queued, in FIFO order.
    pub fn drain(&self) -> Vec<T> {
        let mut guard = self.monitor.lock();
        let drained: Vec<T> = guard.drain().collect();
        guard.notify_all_producers();
        drained
    }
}
