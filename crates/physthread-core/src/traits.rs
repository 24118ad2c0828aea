//! Platform capability traits
//!
//! The worker pool, barrier and critical section are written only against
//! these capabilities. `physthread-runtime` provides one implementation
//! per target platform.

use std::time::Duration;

use crate::error::WorkerError;

/// A binary (set / not set) signal, the equivalent of an OS event object.
pub trait BinarySignal: Send + Sync {
    /// Block until the signal is set.
    ///
    /// An auto-reset signal is consumed by the returning waiter.
    fn wait(&self);

    /// Block until the signal is set or `timeout` elapses.
    ///
    /// Returns `true` if the signal was observed (and, for auto-reset,
    /// consumed), `false` on timeout.
    fn wait_timeout(&self, timeout: Duration) -> bool;

    /// Set the signal and wake waiters.
    fn signal(&self);

    /// Clear the signal without waking anyone.
    fn reset(&self);

    /// Current state (hint, may be stale).
    fn is_signaled(&self) -> bool;
}

/// Mutual exclusion without an owned guard.
///
/// Not reentrant: a thread must not call `lock()` twice without an
/// intervening `unlock()`.
pub trait ExclusionLock: Send + Sync {
    fn lock(&self);

    /// Release the lock. Must only be called by the current holder.
    fn unlock(&self);

    fn try_lock(&self) -> bool;
}

/// Wait for the first of a fixed, ordered set of signals.
pub trait MultiWait: Send + Sync {
    /// Number of signals in the set
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until any member is signaled, consume it, and return its index.
    ///
    /// `None` timeout blocks indefinitely. Returns `None` on timeout.
    /// When several members are ready the lowest index observed ready wins;
    /// there is no FIFO ordering by signal time.
    fn wait_any(&self, timeout: Option<Duration>) -> Option<usize>;
}

/// Per-thread tuning the pool applies to each worker at startup.
///
/// Failures are reported, never fatal: a worker that cannot be pinned or
/// raised still runs.
pub trait PlatformThread: Send + Sync {
    /// Platform name (e.g. "linux")
    fn name(&self) -> &'static str;

    /// Ids of the logical CPUs the calling thread may run on, ascending.
    ///
    /// Under a restricted cpuset these need not start at 0 or be contiguous.
    fn allowed_cpus(&self) -> Vec<usize>;

    /// Number of logical CPUs the calling thread may run on
    fn logical_cpus(&self) -> usize {
        self.allowed_cpus().len().max(1)
    }

    /// Restrict the calling thread to logical CPU id `cpu`
    fn pin_current_thread(&self, cpu: usize) -> Result<(), WorkerError>;

    /// Raise the calling thread to the highest ordinary scheduling priority
    fn raise_current_thread_priority(&self) -> Result<(), WorkerError>;
}
