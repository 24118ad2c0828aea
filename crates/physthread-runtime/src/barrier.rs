//! Reusable N-way barrier
//!
//! One lock and two manual-reset events. `run` releases the waiters of the
//! current generation; `notify` holds back threads that re-enter `sync()`
//! while the previous generation is still draining. The last arriver
//! records how many waiters it released in `enable_counter`; each released
//! waiter counts it down and the one reaching zero opens `notify`.
//!
//! `abort()` opens both events for good: current and future `sync()` calls
//! return at once. A participant that cannot reach `sync()` (its body
//! panicked) uses it to release the rest.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use physthread_core::{BinarySignal, ExclusionLock};

use crate::signal::{Event, OsLock, ResetMode};

pub struct Barrier {
    lock: OsLock,
    run: Event,
    notify: Event,
    // Counters are only touched with `lock` held
    counter: AtomicUsize,
    enable_counter: AtomicUsize,
    max_count: AtomicUsize,
    aborted: AtomicBool,
}

impl Barrier {
    /// A barrier for a single participant; call `set_max_count` before use.
    pub fn new() -> Self {
        Self::with_count(1)
    }

    /// # Panics
    ///
    /// If `max_count` is zero.
    pub fn with_count(max_count: usize) -> Self {
        assert!(max_count >= 1, "barrier needs at least one participant");
        Self {
            lock: OsLock::new(),
            run: Event::new(ResetMode::Manual, "barrierRun"),
            notify: Event::new(ResetMode::Manual, "barrierNotify"),
            counter: AtomicUsize::new(0),
            enable_counter: AtomicUsize::new(0),
            max_count: AtomicUsize::new(max_count),
            aborted: AtomicBool::new(false),
        }
    }

    /// Set the participant count. Must not be called while any thread is
    /// inside `sync()`.
    ///
    /// # Panics
    ///
    /// If `n` is zero.
    pub fn set_max_count(&self, n: usize) {
        assert!(n >= 1, "barrier needs at least one participant");
        self.max_count.store(n, Ordering::Relaxed);
    }

    pub fn max_count(&self) -> usize {
        self.max_count.load(Ordering::Relaxed)
    }

    /// Block until `max_count` threads have called `sync()` for this
    /// generation, or until the barrier is aborted.
    pub fn sync(&self) {
        if self.is_aborted() {
            return;
        }
        self.lock.lock();

        // The previous generation is still being released
        while self.enable_counter.load(Ordering::Relaxed) > 0 {
            if self.is_aborted() {
                self.lock.unlock();
                return;
            }
            self.notify.reset();
            self.lock.unlock();
            self.notify.wait();
            self.lock.lock();
        }
        if self.is_aborted() {
            self.lock.unlock();
            return;
        }

        let arrival = self.counter.fetch_add(1, Ordering::Relaxed);
        if arrival + 1 >= self.max_count.load(Ordering::Relaxed) {
            self.run.signal();
            self.enable_counter.store(arrival, Ordering::Relaxed);
            self.counter.store(0, Ordering::Relaxed);
        } else {
            self.run.reset();
            self.lock.unlock();
            self.run.wait();
            self.lock.lock();
            if self.is_aborted() {
                self.lock.unlock();
                return;
            }
            self.enable_counter.fetch_sub(1, Ordering::Relaxed);
        }

        if self.enable_counter.load(Ordering::Relaxed) == 0 {
            self.notify.signal();
        }

        self.lock.unlock();
    }

    /// Release every thread in `sync()` and make later calls return
    /// immediately. The barrier stays aborted.
    pub fn abort(&self) {
        // Under the lock so no waiter can reset an event after this signals it
        self.lock.lock();
        self.aborted.store(true, Ordering::Release);
        self.run.signal();
        self.notify.signal();
        self.lock.unlock();
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

impl Default for Barrier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Barrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Barrier")
            .field("max_count", &self.max_count())
            .field("aborted", &self.is_aborted())
            .finish_non_exhaustive()
    }
}
