//! Critical section with a shared parameter block
//!
//! Word 0 of the block mirrors the lock state; words 1..32 are the 31
//! caller-visible shared parameters. Parameters are meant to be accessed
//! with the lock held; nothing enforces it.

use std::sync::atomic::{AtomicU32, Ordering};

use physthread_core::constants::{SHARED_BLOCK_WORDS, SHARED_PARAMS};
use physthread_core::ExclusionLock;

use crate::signal::OsLock;

pub struct CriticalSection {
    lock: OsLock,
    common: [AtomicU32; SHARED_BLOCK_WORDS],
}

impl CriticalSection {
    pub fn new() -> Self {
        Self {
            lock: OsLock::new(),
            common: std::array::from_fn(|_| AtomicU32::new(0)),
        }
    }

    /// Acquire. Not reentrant.
    pub fn lock(&self) {
        self.lock.lock();
        self.common[0].store(1, Ordering::Relaxed);
    }

    pub fn unlock(&self) {
        self.common[0].store(0, Ordering::Relaxed);
        self.lock.unlock();
    }

    pub fn try_lock(&self) -> bool {
        if self.lock.try_lock() {
            self.common[0].store(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Lock-state word, as last written by a holder
    pub fn is_locked(&self) -> bool {
        self.common[0].load(Ordering::Relaxed) != 0
    }

    /// Lock and return a guard that unlocks on drop
    pub fn enter(&self) -> CriticalSectionGuard<'_> {
        self.lock();
        CriticalSectionGuard { cs: self }
    }

    /// # Panics
    ///
    /// If `i >= 31`.
    pub fn shared_param(&self, i: usize) -> u32 {
        assert!(i < SHARED_PARAMS, "shared param index {} out of range", i);
        self.common[i + 1].load(Ordering::Relaxed)
    }

    /// # Panics
    ///
    /// If `i >= 31`.
    pub fn set_shared_param(&self, i: usize, value: u32) {
        assert!(i < SHARED_PARAMS, "shared param index {} out of range", i);
        self.common[i + 1].store(value, Ordering::Relaxed);
    }
}

impl Default for CriticalSection {
    fn default() -> Self {
        Self::new()
    }
}

impl ExclusionLock for CriticalSection {
    fn lock(&self) {
        CriticalSection::lock(self)
    }

    fn unlock(&self) {
        CriticalSection::unlock(self)
    }

    fn try_lock(&self) -> bool {
        CriticalSection::try_lock(self)
    }
}

/// Holds a `CriticalSection` locked
pub struct CriticalSectionGuard<'a> {
    cs: &'a CriticalSection,
}

impl CriticalSectionGuard<'_> {
    pub fn shared_param(&self, i: usize) -> u32 {
        self.cs.shared_param(i)
    }

    pub fn set_shared_param(&self, i: usize, value: u32) {
        self.cs.set_shared_param(i, value)
    }
}

impl Drop for CriticalSectionGuard<'_> {
    fn drop(&mut self) {
        self.cs.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_two_threads_no_lost_updates() {
        const M: u32 = 10_000;
        let cs = Arc::new(CriticalSection::new());
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let cs = Arc::clone(&cs);
                thread::spawn(move || {
                    for _ in 0..M {
                        cs.lock();
                        let v = cs.shared_param(0);
                        cs.set_shared_param(0, v + 1);
                        cs.unlock();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cs.shared_param(0), 2 * M);
    }

    #[test]
    fn test_lock_word_tracks_holder() {
        let cs = CriticalSection::new();
        assert!(!cs.is_locked());
        {
            let guard = cs.enter();
            assert!(cs.is_locked());
            guard.set_shared_param(30, 7);
            assert!(!cs.try_lock());
        }
        assert!(!cs.is_locked());
        assert_eq!(cs.shared_param(30), 7);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_param_31_panics() {
        CriticalSection::new().shared_param(31);
    }
}
