//! Kernel Synchronization Primitives - host-backed platform layer
//!
//! # Purpose
//! Mirrors the in-kernel synchronization API (mutual-exclusion lock,
//! condition variable, counting semaphore) so subsystems built on top of
//! it can be developed and tested on any host. The kernel build swaps the
//! backend; the API surface stays the same.
//!
//! # Integration Points
//! - Depends on: host `std::sync` (this backend only)
//! - Provides to: process management, and any subsystem needing blocking
//!   primitives
//!
//! # Architecture
//! Every primitive carries a static name, matching the kernel convention
//! of naming synchronization objects at creation time. Names show up in
//! diagnostics only; they impose no uniqueness requirement.
//!
//! # Testing Strategy
//! - Unit tests: mutual exclusion, condvar wakeup, semaphore blocking

use std::sync::{Condvar as StdCondvar, Mutex as StdMutex, MutexGuard as StdMutexGuard};

/// Named mutual-exclusion lock guarding a value.
///
/// Kernel locks do not poison: a panic while holding the lock is already
/// fatal to the system, so poison errors from the host backend are
/// absorbed rather than propagated.
pub struct Lock<T> {
    name: &'static str,
    inner: StdMutex<T>,
}

/// Guard returned by [`Lock::lock`]. The lock is released on drop.
pub struct LockGuard<'a, T> {
    inner: StdMutexGuard<'a, T>,
}

impl<T> Lock<T> {
    pub fn new(name: &'static str, value: T) -> Self {
        Self {
            name,
            inner: StdMutex::new(value),
        }
    }

    /// Acquire the lock, blocking until it is available.
    pub fn lock(&self) -> LockGuard<'_, T> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        LockGuard { inner: guard }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Exclusive access without locking; only possible when the caller
    /// holds the sole reference.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T> core::ops::Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> core::ops::DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

/// Named condition variable, used together with a [`Lock`].
pub struct Condvar {
    name: &'static str,
    inner: StdCondvar,
}

impl Condvar {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: StdCondvar::new(),
        }
    }

    /// Atomically release the lock and suspend the calling thread until
    /// signaled, then reacquire the lock before returning.
    ///
    /// Spurious wakeups are possible; callers re-test their predicate in
    /// a loop.
    pub fn wait<'a, T>(&self, guard: LockGuard<'a, T>) -> LockGuard<'a, T> {
        let inner = self
            .inner
            .wait(guard.inner)
            .unwrap_or_else(|e| e.into_inner());
        LockGuard { inner }
    }

    /// Wake one waiter.
    pub fn signal(&self) {
        self.inner.notify_one();
    }

    /// Wake all waiters.
    pub fn broadcast(&self) {
        self.inner.notify_all();
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Named counting semaphore.
pub struct Semaphore {
    name: &'static str,
    count: StdMutex<usize>,
    cv: StdCondvar,
}

impl Semaphore {
    pub fn new(name: &'static str, initial: usize) -> Self {
        Self {
            name,
            count: StdMutex::new(initial),
            cv: StdCondvar::new(),
        }
    }

    /// P: block until the count is positive, then decrement it.
    pub fn acquire(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        while *count == 0 {
            count = self.cv.wait(count).unwrap_or_else(|e| e.into_inner());
        }
        *count -= 1;
    }

    /// V: increment the count and wake one waiter.
    pub fn release(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count += 1;
        self.cv.notify_one();
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
