//! Worker slot status
//!
//! The status word is the ownership token of a slot: the coordinator owns
//! the slot's fields while it is `Idle` or `Completed`, the worker owns them
//! while it is `Dispatched`.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

/// State of a worker slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SlotStatus {
    /// No work outstanding, coordinator may dispatch
    Idle = 0,

    /// Work handed to the worker, not yet finished
    Dispatched = 1,

    /// Worker finished, result not yet consumed by the coordinator
    Completed = 2,

    /// Worker observed the shutdown request and is terminating
    Exiting = 3,
}

impl SlotStatus {
    /// True while the slot holds work the coordinator has not consumed
    #[inline]
    pub const fn is_busy(&self) -> bool {
        matches!(self, SlotStatus::Dispatched | SlotStatus::Completed)
    }

    /// Check whether `self -> next` is one of the sanctioned transitions
    pub const fn can_transition_to(&self, next: SlotStatus) -> bool {
        matches!(
            (self, next),
            (SlotStatus::Idle, SlotStatus::Dispatched)
                | (SlotStatus::Dispatched, SlotStatus::Completed)
                | (SlotStatus::Completed, SlotStatus::Idle)
                | (SlotStatus::Idle, SlotStatus::Exiting)
        )
    }
}

impl From<u8> for SlotStatus {
    fn from(v: u8) -> Self {
        match v {
            0 => SlotStatus::Idle,
            1 => SlotStatus::Dispatched,
            2 => SlotStatus::Completed,
            _ => SlotStatus::Exiting,
        }
    }
}

impl From<SlotStatus> for u8 {
    fn from(status: SlotStatus) -> u8 {
        status as u8
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotStatus::Idle => "idle",
            SlotStatus::Dispatched => "dispatched",
            SlotStatus::Completed => "completed",
            SlotStatus::Exiting => "exiting",
        };
        f.write_str(s)
    }
}

/// Atomic cell holding a `SlotStatus`
pub struct AtomicSlotStatus(AtomicU8);

impl AtomicSlotStatus {
    pub const fn new(status: SlotStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    #[inline]
    pub fn load(&self) -> SlotStatus {
        SlotStatus::from(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, status: SlotStatus) {
        self.0.store(status as u8, Ordering::Release);
    }

    /// Move from `current` to `next`, returning the observed status on failure
    #[inline]
    pub fn transition(&self, current: SlotStatus, next: SlotStatus) -> Result<(), SlotStatus> {
        debug_assert!(current.can_transition_to(next), "illegal slot transition {} -> {}", current, next);
        self.0
            .compare_exchange(current as u8, next as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(SlotStatus::from)
    }
}

impl Default for AtomicSlotStatus {
    fn default() -> Self {
        Self::new(SlotStatus::Idle)
    }
}

impl fmt::Debug for AtomicSlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AtomicSlotStatus({:?})", self.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_roundtrip() {
        for s in [SlotStatus::Idle, SlotStatus::Dispatched, SlotStatus::Completed, SlotStatus::Exiting] {
            assert_eq!(SlotStatus::from(u8::from(s)), s);
        }
    }

    #[test]
    fn test_sanctioned_transitions() {
        assert!(SlotStatus::Idle.can_transition_to(SlotStatus::Dispatched));
        assert!(SlotStatus::Dispatched.can_transition_to(SlotStatus::Completed));
        assert!(SlotStatus::Completed.can_transition_to(SlotStatus::Idle));
        assert!(SlotStatus::Idle.can_transition_to(SlotStatus::Exiting));

        assert!(!SlotStatus::Dispatched.can_transition_to(SlotStatus::Dispatched));
        assert!(!SlotStatus::Dispatched.can_transition_to(SlotStatus::Exiting));
        assert!(!SlotStatus::Exiting.can_transition_to(SlotStatus::Idle));
    }

    #[test]
    fn test_transition_reports_observed() {
        let s = AtomicSlotStatus::default();
        assert!(s.transition(SlotStatus::Idle, SlotStatus::Dispatched).is_ok());
        assert_eq!(s.transition(SlotStatus::Idle, SlotStatus::Dispatched), Err(SlotStatus::Dispatched));
        assert_eq!(s.load(), SlotStatus::Dispatched);
    }
}
