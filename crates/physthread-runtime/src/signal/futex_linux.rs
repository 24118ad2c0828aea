//! Linux futex wait word
//!
//! `wait(expected)` sleeps only while the word still holds `expected`;
//! callers change the word first and then call `wake_*`, so a wake can
//! never be lost between a waiter's check and its sleep.

use std::sync::atomic::AtomicU32;
use std::time::Duration;

pub struct WaitWord {
    word: AtomicU32,
}

impl WaitWord {
    pub const fn new(value: u32) -> Self {
        Self { word: AtomicU32::new(value) }
    }

    #[inline]
    pub fn atomic(&self) -> &AtomicU32 {
        &self.word
    }

    /// Sleep while the word equals `expected`.
    ///
    /// Returns `false` only when `timeout` elapsed. Wakes, value mismatches
    /// and interrupted sleeps all return `true`; callers re-check their
    /// condition either way.
    pub fn wait(&self, expected: u32, timeout: Option<Duration>) -> bool {
        let timespec = timeout.map(|d| libc::timespec {
            tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_nsec: d.subsec_nanos() as _,
        });
        let timespec_ptr = match &timespec {
            Some(ts) => ts as *const libc::timespec,
            None => std::ptr::null(),
        };

        // FUTEX_WAIT takes a relative timeout
        let result = unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.word.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                expected,
                timespec_ptr,
                std::ptr::null::<u32>(),
                0u32,
            )
        };

        if result == 0 {
            return true;
        }
        std::io::Error::last_os_error().raw_os_error() != Some(libc::ETIMEDOUT)
    }

    pub fn wake_one(&self) {
        self.wake(1);
    }

    pub fn wake_all(&self) {
        self.wake(i32::MAX);
    }

    fn wake(&self, count: i32) {
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.word.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                count,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }
}
