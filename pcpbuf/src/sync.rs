#[cfg(not(feature = "loom"))]
pub use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "loom")]
pub use loom::sync::atomic::{AtomicBool, Ordering};

#[cfg(not(feature = "loom"))]
pub use parking_lot::{Condvar, Mutex, MutexGuard};

#[cfg(feature = "loom")]
pub use self::model::{Condvar, Mutex, MutexGuard};

/// parking_lot-shaped wrappers over the loom primitives, so the monitor code
/// is written once against the `&mut guard` condvar API.
#[cfg(feature = "loom")]
mod model {
    use std::ops::{Deref, DerefMut};
    use std::time::Duration;

    pub struct Mutex<T> {
        inner: loom::sync::Mutex<T>,
    }

    impl<T> Mutex<T> {
        pub fn new(value: T) -> Self {
            Self {
                inner: loom::sync::Mutex::new(value),
            }
        }

        pub fn lock(&self) -> MutexGuard<'_, T> {
            MutexGuard {
                inner: Some(self.inner.lock().unwrap()),
            }
        }

        pub fn into_inner(self) -> T {
            self.inner.into_inner().unwrap()
        }
    }

    pub struct MutexGuard<'a, T> {
        inner: Option<loom::sync::MutexGuard<'a, T>>,
    }

    impl<T> Deref for MutexGuard<'_, T> {
        type Target = T;

        fn deref(&self) -> &T {
            self.inner.as_deref().unwrap()
        }
    }

    impl<T> DerefMut for MutexGuard<'_, T> {
        fn deref_mut(&mut self) -> &mut T {
            self.inner.as_deref_mut().unwrap()
        }
    }

    pub struct WaitTimeoutResult(bool);

    impl WaitTimeoutResult {
        pub fn timed_out(&self) -> bool {
            self.0
        }
    }

    pub struct Condvar {
        inner: loom::sync::Condvar,
    }

    impl Condvar {
        pub fn new() -> Self {
            Self {
                inner: loom::sync::Condvar::new(),
            }
        }

        pub fn wait<T>(&self, guard: &mut MutexGuard<'_, T>) {
            let held = guard.inner.take().unwrap();
            guard.inner = Some(self.inner.wait(held).unwrap());
        }

        pub fn wait_for<T>(
            &self,
            guard: &mut MutexGuard<'_, T>,
            timeout: Duration,
        ) -> WaitTimeoutResult {
            let held = guard.inner.take().unwrap();
            let (held, result) = self.inner.wait_timeout(held, timeout).unwrap();
            guard.inner = Some(held);
            WaitTimeoutResult(result.timed_out())
        }

        pub fn notify_one(&self) -> bool {
            self.inner.notify_one();
            true
        }

        pub fn notify_all(&self) -> usize {
            self.inner.notify_all();
            0
        }
    }
}
