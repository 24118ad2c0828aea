//! Spinlock used as a hand-off cell
//!
//! Slot payloads (the dispatched input, the produced output) are passed
//! between the coordinator and a worker under the slot-status protocol, so
//! the lock is never actually contended. It exists to give the hand-off a
//! safe interface; the spin path only runs if the protocol is broken.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

/// A simple spinlock
pub struct SpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// Safety: SpinLock provides exclusive access to T
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        SpinLock {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquire the lock, spinning until it's available
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let mut spin_count = 0u32;
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spin_count = spin_count.wrapping_add(1);
            if spin_count < 64 {
                core::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
        SpinLockGuard { lock: self }
    }

    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinLockGuard { lock: self })
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T> SpinLock<Option<T>> {
    /// Store `value`, returning whatever was there
    #[inline]
    pub fn put(&self, value: T) -> Option<T> {
        self.lock().replace(value)
    }

    /// Take the stored value, leaving `None`
    #[inline]
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        SpinLock::new(T::default())
    }
}

/// Guard that releases the spinlock when dropped
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<'a, T> Deref for SpinLockGuard<'a, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // Safety: We hold the lock
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T> DerefMut for SpinLockGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: We hold the lock
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T> Drop for SpinLockGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_put_take() {
        let cell: SpinLock<Option<u32>> = SpinLock::new(None);
        assert_eq!(cell.put(7), None);
        assert_eq!(cell.put(9), Some(7));
        assert_eq!(cell.take(), Some(9));
        assert_eq!(cell.take(), None);
    }

    #[test]
    fn test_try_lock_while_held() {
        let lock = SpinLock::new(0u32);
        let guard = lock.try_lock();
        assert!(guard.is_some());
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_handoff_between_threads() {
        let cell = Arc::new(SpinLock::new(None::<Vec<u8>>));
        let producer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                cell.put(vec![1, 2, 3]);
            })
        };
        producer.join().unwrap();
        assert_eq!(cell.take(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_contended_counter() {
        let lock = Arc::new(SpinLock::new(0u32));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *lock.lock() += 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.lock(), 4000);
    }
}
