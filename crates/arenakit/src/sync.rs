//! Spin-wait mutual exclusion with adaptive backoff.
//!
//! [`Spinlock`] guards structures that are not lock-free by construction
//! (the bump allocator's cursor, the plain free list) when they must be
//! shared across threads. Acquisition spins with a CPU-yield hint for a
//! bounded number of iterations, then escalates to real thread sleeps with
//! a ramping duration: spinning is cheap and low-latency under brief
//! contention, sleeping avoids burning a core under prolonged contention.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Spin iterations before [`Sleeper`] escalates to sleeping.
const MAX_SPINS: u32 = 4000;

/// First sleep duration once the spin budget is exhausted. Usually below
/// the kernel's minimum sleep, so the thread is typically scheduled out
/// for the minimum quantum.
const MIN_SLEEP: Duration = Duration::from_micros(500);

/// Ceiling for the sleep ramp.
const MAX_SLEEP: Duration = Duration::from_millis(2);

/// Adaptive wait helper: busy-spin for the first `max_spins` calls, then
/// sleep with a doubling duration from `min` up to `max`, holding at `max`.
///
/// State is local to one acquisition attempt; construct a fresh `Sleeper`
/// per `lock()` call.
pub struct Sleeper {
    spins: u32,
    max_spins: u32,
    current: Duration,
    max: Duration,
}

impl Sleeper {
    pub fn new() -> Self {
        Self::with_budget(MAX_SPINS, MIN_SLEEP, MAX_SLEEP)
    }

    /// A sleeper with a custom spin budget and sleep ramp.
    pub fn with_budget(max_spins: u32, min: Duration, max: Duration) -> Self {
        Self {
            spins: 0,
            max_spins,
            current: min,
            max,
        }
    }

    /// Wait once: a CPU-yield hint while the spin budget lasts, a real
    /// sleep afterwards.
    #[inline]
    pub fn wait(&mut self) {
        if self.spins < self.max_spins {
            self.spins += 1;
            core::hint::spin_loop();
            return;
        }
        thread::sleep(self.current);
        self.current = (self.current * 2).min(self.max);
    }
}

impl Default for Sleeper {
    fn default() -> Self {
        Self::new()
    }
}

/// A mutual-exclusion gate: one flag word, no ownership of protected data.
///
/// `lock()` never times out; it returns once the holder releases. Recursive
/// locking by the same thread deadlocks (a usage precondition, not a
/// runtime-checked error).
pub struct Spinlock {
    locked: AtomicBool,
}

impl Spinlock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Try to acquire without blocking. Returns true if the lock was taken.
    #[inline]
    pub fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Acquire, blocking until the holder releases.
    #[inline]
    pub fn lock(&self) {
        // Fast path: uncontended
        if self.try_lock() {
            return;
        }
        self.lock_slow();
    }

    #[cold]
    fn lock_slow(&self) {
        let mut sleeper = Sleeper::new();
        loop {
            // Wait until a CAS might succeed; the plain load keeps the
            // cache line shared instead of bouncing it on every retry.
            while self.locked.load(Ordering::Relaxed) {
                sleeper.wait();
            }
            if self.try_lock() {
                return;
            }
        }
    }

    /// Release the lock. Must only be called by the current holder.
    #[inline]
    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

impl Default for Spinlock {
    fn default() -> Self {
        Self::new()
    }
}

/// Locking policy seam for [`crate::allocator::Allocator`]: either a real
/// [`Spinlock`] or the no-op [`NoopLock`] for single-threaded use.
pub trait LockPolicy: Default {
    fn lock(&self);
    fn unlock(&self);
}

/// Policy that does no locking. The single-threaded default.
#[derive(Default)]
pub struct NoopLock;

impl LockPolicy for NoopLock {
    #[inline(always)]
    fn lock(&self) {}

    #[inline(always)]
    fn unlock(&self) {}
}

impl LockPolicy for Spinlock {
    #[inline]
    fn lock(&self) {
        Spinlock::lock(self);
    }

    #[inline]
    fn unlock(&self) {
        Spinlock::unlock(self);
    }
}

/// A spinlock that wraps data, similar to `std::sync::Mutex` but backed by
/// [`Spinlock`]'s spin-then-sleep acquisition.
pub struct SpinMutex<T> {
    lock: Spinlock,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for SpinMutex<T> {}
unsafe impl<T: Send> Sync for SpinMutex<T> {}

impl<T> SpinMutex<T> {
    pub const fn new(data: T) -> Self {
        Self {
            lock: Spinlock::new(),
            data: UnsafeCell::new(data),
        }
    }

    pub fn lock(&self) -> SpinGuard<'_, T> {
        self.lock.lock();
        SpinGuard { mutex: self }
    }

    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        if self.lock.try_lock() {
            Some(SpinGuard { mutex: self })
        } else {
            None
        }
    }
}

pub struct SpinGuard<'a, T> {
    mutex: &'a SpinMutex<T>,
}

impl<T> core::ops::Deref for SpinGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> core::ops::DerefMut for SpinGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.lock.unlock();
    }
}
