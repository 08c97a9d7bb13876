use crate::sync::{AtomicBool, Condvar, Mutex, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Process-wide keep-running flag shared by every pipeline thread.
///
/// The flag goes from running to stopped exactly once. The inner lock is a
/// leaf: it is never held while another lock is acquired.
#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

struct Inner {
    running: AtomicBool,
    lock: Mutex<()>,
    stopped: Condvar,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        Shutdown {
            inner: Arc::new(Inner {
                running: AtomicBool::new(true),
                lock: Mutex::new(()),
                stopped: Condvar::new(),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Flip the flag to stopped. Returns `true` only for the call that
    /// performed the transition.
    pub fn trigger(&self) -> bool {
        let _guard = self.inner.lock.lock();
        let was_running = self.inner.running.swap(false, Ordering::AcqRel);
        if was_running {
            debug!("shutdown requested");
            self.inner.stopped.notify_all();
        }
        was_running
    }

    /// Block until [`trigger`](Self::trigger) is called.
    pub fn wait(&self) {
        let mut guard = self.inner.lock.lock();
        while self.is_running() {
            self.inner.stopped.wait(&mut guard);
        }
    }

    /// Sleep for `timeout` or until shutdown, whichever comes first.
    /// Returns `true` if the pipeline is still running afterwards.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock.lock();
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.inner.stopped.wait_for(&mut guard, deadline - now);
        }
        self.is_running()
    }
}
