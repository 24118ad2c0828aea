//! Signals, locks and wait-any groups
//!
//! Everything here sits on one primitive, a 32-bit wait word: a futex on
//! Linux, a mutex/condvar pair elsewhere. On top of it:
//!
//! - `Event` - binary signal, auto- or manual-reset
//! - `EventGroup` - ordered set of auto-reset events with wait-any
//! - `OsLock` - blocking mutual exclusion without a guard

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use physthread_core::{BinarySignal, ExclusionLock, MultiWait};

// Platform-specific wait word
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::WaitWord;
    } else {
        mod fallback;
        pub use fallback::WaitWord;
    }
}

const CLEAR: u32 = 0;
const SET: u32 = 1;

/// Absolute deadline `timeout` from now; `None` when it is past what
/// `Instant` can represent, which waits without a deadline.
#[inline]
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Whether a satisfied wait clears the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Exactly one waiter consumes each signal
    Auto,
    /// Stays set, releasing every waiter, until `reset()`
    Manual,
}

/// Binary signal, the equivalent of an OS event object.
pub struct Event {
    state: WaitWord,
    mode: ResetMode,
    group: Option<Arc<WaitWord>>,
    name: String,
}

impl Event {
    /// A new, clear event
    pub fn new(mode: ResetMode, name: impl Into<String>) -> Self {
        Self {
            state: WaitWord::new(CLEAR),
            mode,
            group: None,
            name: name.into(),
        }
    }

    fn in_group(name: String, group: Arc<WaitWord>) -> Self {
        Self {
            state: WaitWord::new(CLEAR),
            mode: ResetMode::Auto,
            group: Some(group),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ResetMode {
        self.mode
    }

    /// Take the signal if it is set, without blocking
    #[inline]
    pub fn try_acquire(&self) -> bool {
        match self.mode {
            ResetMode::Auto => self
                .state
                .atomic()
                .compare_exchange(SET, CLEAR, Ordering::AcqRel, Ordering::Acquire)
                .is_ok(),
            ResetMode::Manual => self.state.atomic().load(Ordering::Acquire) == SET,
        }
    }

    fn wait_until(&self, deadline: Option<Instant>) -> bool {
        loop {
            if self.try_acquire() {
                return true;
            }
            let remaining = match deadline {
                Some(d) => {
                    let left = d.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return self.try_acquire();
                    }
                    Some(left)
                }
                None => None,
            };
            self.state.wait(CLEAR, remaining);
        }
    }
}

impl BinarySignal for Event {
    fn wait(&self) {
        self.wait_until(None);
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        self.wait_until(deadline_after(timeout))
    }

    fn signal(&self) {
        self.state.atomic().store(SET, Ordering::SeqCst);
        match self.mode {
            ResetMode::Auto => self.state.wake_one(),
            ResetMode::Manual => self.state.wake_all(),
        }
        if let Some(group) = &self.group {
            group.atomic().fetch_add(1, Ordering::SeqCst);
            group.wake_all();
        }
    }

    fn reset(&self) {
        self.state.atomic().store(CLEAR, Ordering::SeqCst);
    }

    fn is_signaled(&self) -> bool {
        self.state.atomic().load(Ordering::Relaxed) == SET
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("signaled", &self.is_signaled())
            .finish()
    }
}

/// Ordered set of auto-reset events supporting wait-any.
///
/// Members bump a shared sequence word when signaled, so a waiter scans the
/// members and sleeps on the sequence word rather than on each event.
pub struct EventGroup {
    sequence: Arc<WaitWord>,
    events: Vec<Arc<Event>>,
}

impl EventGroup {
    /// One auto-reset member per name, indexed in iteration order
    pub fn auto_reset<I>(names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let sequence = Arc::new(WaitWord::new(0));
        let events = names
            .into_iter()
            .map(|name| Arc::new(Event::in_group(name, Arc::clone(&sequence))))
            .collect();
        Self { sequence, events }
    }

    pub fn get(&self, index: usize) -> &Arc<Event> {
        &self.events[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Event>> {
        self.events.iter()
    }

    fn scan(&self) -> Option<usize> {
        self.events.iter().position(|e| e.try_acquire())
    }
}

impl MultiWait for EventGroup {
    fn len(&self) -> usize {
        self.events.len()
    }

    fn wait_any(&self, timeout: Option<Duration>) -> Option<usize> {
        let deadline = timeout.and_then(deadline_after);
        loop {
            // Read the sequence before scanning so a signal landing after
            // the scan changes the word and the sleep returns at once.
            let seq = self.sequence.atomic().load(Ordering::SeqCst);
            if let Some(index) = self.scan() {
                return Some(index);
            }
            let remaining = match deadline {
                Some(d) => {
                    let left = d.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return None;
                    }
                    Some(left)
                }
                None => None,
            };
            self.sequence.wait(seq, remaining);
        }
    }
}

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;
const CONTENDED: u32 = 2;

/// Blocking lock without an owned guard.
///
/// Three-state futex mutex: 0 free, 1 held, 2 held with possible sleepers.
/// Not reentrant.
pub struct OsLock {
    word: WaitWord,
}

impl OsLock {
    pub const fn new() -> Self {
        Self { word: WaitWord::new(UNLOCKED) }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.word.atomic().load(Ordering::Relaxed) != UNLOCKED
    }
}

impl Default for OsLock {
    fn default() -> Self {
        Self::new()
    }
}

impl ExclusionLock for OsLock {
    fn lock(&self) {
        let word = self.word.atomic();
        if word
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }
        while word.swap(CONTENDED, Ordering::Acquire) != UNLOCKED {
            self.word.wait(CONTENDED, None);
        }
    }

    fn unlock(&self) {
        if self.word.atomic().swap(UNLOCKED, Ordering::Release) == CONTENDED {
            self.word.wake_one();
        }
    }

    fn try_lock(&self) -> bool {
        self.word
            .atomic()
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}
