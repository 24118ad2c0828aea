//! Portable wait word using std::sync::Condvar
//!
//! Used on platforms without futex support. Same contract as the futex
//! version: the word is checked under the mutex, and wakers take the mutex
//! before notifying, so a change-then-wake cannot slip past a waiter.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

pub struct WaitWord {
    word: AtomicU32,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl WaitWord {
    pub const fn new(value: u32) -> Self {
        Self {
            word: AtomicU32::new(value),
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    #[inline]
    pub fn atomic(&self) -> &AtomicU32 {
        &self.word
    }

    /// Sleep while the word equals `expected`; `false` only on timeout.
    pub fn wait(&self, expected: u32, timeout: Option<Duration>) -> bool {
        let guard = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);
        if self.word.load(Ordering::SeqCst) != expected {
            return true;
        }
        match timeout {
            Some(t) => {
                let (_guard, result) = self
                    .condvar
                    .wait_timeout(guard, t)
                    .unwrap_or_else(PoisonError::into_inner);
                !result.timed_out()
            }
            None => {
                let _guard = self.condvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
                true
            }
        }
    }

    pub fn wake_one(&self) {
        drop(self.mutex.lock().unwrap_or_else(PoisonError::into_inner));
        self.condvar.notify_one();
    }

    pub fn wake_all(&self) {
        drop(self.mutex.lock().unwrap_or_else(PoisonError::into_inner));
        self.condvar.notify_all();
    }
}
