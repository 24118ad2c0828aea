//! # physthread-runtime
//!
//! Platform-specific runtime for the physthread worker pool.
//!
//! This crate provides:
//! - Wait words, events, wait-any groups and locks (futex on Linux)
//! - CPU pinning and priority elevation for workers
//! - The fixed-size `WorkerThreadPool`
//! - `Barrier` and `CriticalSection` for manual parallel regions
//! - Pool configuration with build-time defaults

pub mod config;
pub mod signal;
pub mod worker;
pub mod barrier;
pub mod critical_section;

// Re-exports
pub use config::PoolConfig;
pub use worker::{current_worker, Response, WorkerIdentity, WorkerSlot, WorkerThreadPool};
pub use barrier::Barrier;
pub use critical_section::{CriticalSection, CriticalSectionGuard};
pub use signal::{Event, EventGroup, OsLock, ResetMode};

// Platform detection
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod platform_linux;
        pub use platform_linux::LinuxPlatform as CurrentPlatform;
    } else {
        mod platform_generic;
        pub use platform_generic::GenericPlatform as CurrentPlatform;
    }
}
