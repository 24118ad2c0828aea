//! # physthread-core
//!
//! Core types and traits for the physthread worker pool.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! All platform-specific implementations are in `physthread-runtime`.
//!
//! ## Modules
//!
//! - `status` - Worker slot status
//! - `traits` - Signal / exclusion / multi-wait / thread-tuning capability traits
//! - `spinlock` - Uncontended hand-off cell for slot payloads
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

#![allow(dead_code)]

pub mod status;
pub mod traits;
pub mod spinlock;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use status::{SlotStatus, AtomicSlotStatus};
pub use traits::{BinarySignal, ExclusionLock, MultiWait, PlatformThread};
pub use spinlock::{SpinLock, SpinLockGuard};
pub use error::{PoolError, PoolResult, WorkerError};
pub use env::{env_get, env_get_bool, env_get_in_range, env_get_opt, env_get_str, env_is_set};

/// Constants shared by the pool and the scheduler layer
pub mod constants {
    /// Smallest accepted worker / solver count
    pub const MIN_THREADS: usize = 1;

    /// Largest accepted worker / solver count (thread-count setting clamp).
    /// The only definition; pool config, scheduler and setting all read it.
    pub const MAX_THREADS: usize = 16;

    /// Number of words in a critical section's shared block
    pub const SHARED_BLOCK_WORDS: usize = 32;

    /// Caller-visible shared parameters (word 0 is the "locked" flag)
    pub const SHARED_PARAMS: usize = SHARED_BLOCK_WORDS - 1;
}
