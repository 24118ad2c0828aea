//! Runtime-tunable thread count
//!
//! The host's "number of simulation threads" knob. Writes outside
//! `[MIN_THREADS, MAX_THREADS]` are dropped without an error; callers that
//! care check the returned flag.

use std::sync::atomic::{AtomicUsize, Ordering};

use physthread_core::constants::{MAX_THREADS, MIN_THREADS};
use physthread_core::{env_get_in_range, kdebug};

/// Default when `PHYS_NUM_THREADS` is unset or invalid
pub const DEFAULT_THREAD_COUNT: usize = 8;

#[derive(Debug)]
pub struct ThreadCountSetting {
    value: AtomicUsize,
}

impl ThreadCountSetting {
    /// Initial value from `PHYS_NUM_THREADS`, else `DEFAULT_THREAD_COUNT`
    pub fn from_env() -> Self {
        Self::new(env_get_in_range("PHYS_NUM_THREADS", DEFAULT_THREAD_COUNT, MIN_THREADS..=MAX_THREADS))
    }

    /// Out-of-range `initial` falls back to `DEFAULT_THREAD_COUNT`
    pub fn new(initial: usize) -> Self {
        let initial = if Self::accepts(initial) { initial } else { DEFAULT_THREAD_COUNT };
        Self {
            value: AtomicUsize::new(initial),
        }
    }

    #[inline]
    pub fn accepts(n: usize) -> bool {
        (MIN_THREADS..=MAX_THREADS).contains(&n)
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.value.load(Ordering::Acquire)
    }

    /// Store `n` if it is in range; returns whether it was stored
    pub fn set(&self, n: usize) -> bool {
        if !Self::accepts(n) {
            kdebug!("thread count {} ignored, outside [{}, {}]", n, MIN_THREADS, MAX_THREADS);
            return false;
        }
        self.value.store(n, Ordering::Release);
        true
    }
}

impl Default for ThreadCountSetting {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_writes_ignored() {
        let s = ThreadCountSetting::new(4);
        assert!(!s.set(0));
        assert!(!s.set(17));
        assert_eq!(s.get(), 4);
        assert!(s.set(16));
        assert_eq!(s.get(), 16);
        assert!(s.set(1));
        assert_eq!(s.get(), 1);
    }

    #[test]
    fn test_invalid_initial_uses_default() {
        assert_eq!(ThreadCountSetting::new(0).get(), DEFAULT_THREAD_COUNT);
        assert_eq!(ThreadCountSetting::new(99).get(), DEFAULT_THREAD_COUNT);
    }
}
