use crate::sync::{Condvar, Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// One mutex and two condition variables guarding a value.
///
/// `producer` is signalled when room has been freed and wakes producers,
/// `consumer` is signalled when data has arrived and wakes consumers. The
/// `notify_*` and `wait_for_*` names refer to the role being unblocked or
/// waited upon, not to the caller.
pub struct Monitor<T> {
    state: Mutex<T>,
    producer: Condvar,
    consumer: Condvar,
}

impl<T> Monitor<T> {
    pub fn new(value: T) -> Self {
        Monitor {
            state: Mutex::new(value),
            producer: Condvar::new(),
            consumer: Condvar::new(),
        }
    }

    /// Acquire the monitor. Dropping the guard unlocks it.
    pub fn lock(&self) -> MonitorGuard<'_, T> {
        MonitorGuard {
            monitor: self,
            guard: self.state.lock(),
        }
    }

    pub fn notify_producer(&self) {
        self.producer.notify_one();
    }

    pub fn notify_consumer(&self) {
        self.consumer.notify_one();
    }

    pub fn notify_all_producers(&self) {
        self.producer.notify_all();
    }

    pub fn notify_all_consumers(&self) {
        self.consumer.notify_all();
    }

    pub fn into_inner(self) -> T {
        self.state.into_inner()
    }
}

impl<T: Default> Default for Monitor<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Locked access to a [`Monitor`]'s value.
pub struct MonitorGuard<'a, T> {
    monitor: &'a Monitor<T>,
    guard: MutexGuard<'a, T>,
}

impl<T> MonitorGuard<'_, T> {
    /// Release the lock and park until a producer signals new data.
    ///
    /// Wake-ups may be spurious; callers re-check their predicate.
    pub fn wait_for_producer(&mut self) {
        self.monitor.consumer.wait(&mut self.guard);
    }

    /// Release the lock and park until a consumer signals freed room.
    pub fn wait_for_consumer(&mut self) {
        self.monitor.producer.wait(&mut self.guard);
    }

    /// Bounded [`wait_for_producer`](Self::wait_for_producer). Returns `true`
    /// when the timeout elapsed without a signal.
    pub fn timed_wait_for_producer(&mut self, timeout: Duration) -> bool {
        self.monitor
            .consumer
            .wait_for(&mut self.guard, timeout)
            .timed_out()
    }

    pub fn notify_producer(&self) {
        self.monitor.notify_producer();
    }

    pub fn notify_consumer(&self) {
        self.monitor.notify_consumer();
    }

    pub fn notify_all_producers(&self) {
        self.monitor.notify_all_producers();
    }

    pub fn notify_all_consumers(&self) {
        self.monitor.notify_all_consumers();
    }
}

impl<T> Deref for MonitorGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for MonitorGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
