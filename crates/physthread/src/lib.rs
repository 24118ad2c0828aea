//! # physthread - worker threads for physics simulation
//!
//! A fixed pool of persistent, CPU-pinned workers driven by one
//! coordinating thread, the barrier and critical section used for manual
//! parallel regions, and a registry of interchangeable task schedulers
//! feeding a pooled constraint solver.
//!
//! ## Quick Start
//!
//! ```ignore
//! use physthread::{PoolConfig, WorkerThreadPool};
//!
//! let config = PoolConfig::from_env().num_threads(4).unique_name("squares");
//! let pool = WorkerThreadPool::new(&config, |x: u64, _: &mut ()| x * x, || ())?;
//!
//! for (slot, x) in [1u64, 2, 3, 4].into_iter().enumerate() {
//!     pool.send_request(0, x, slot);
//! }
//! for _ in 0..4 {
//!     let r = pool.wait_for_response();
//!     println!("slot {} -> {:?}", r.task_id, r.output);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   coordinator ──send_request──▶ slot i ──start──▶ worker i
//!        ▲                                             │
//!        └──── wait_for_response ◀── completion i ◀────┘
//!
//!   PhysicsHost ─▶ TaskSchedulerRegistry ─▶ { Sequential, ThreadPool, Rayon }
//!        │                                          │
//!        └─▶ PhysicsEnvironment::step ─▶ parallel_for over islands
//!                                         └─▶ ConstraintSolverPool
//! ```

// Re-export core types
pub use physthread_core::{
    AtomicSlotStatus,
    BinarySignal,
    ExclusionLock,
    MultiWait,
    PlatformThread,
    PoolError,
    PoolResult,
    SlotStatus,
    SpinLock,
    WorkerError,
};
pub use physthread_core::constants;

// Re-export kprint macros for debug logging
pub use physthread_core::{kprint, kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use physthread_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled, set_thread_tag_enabled};

// Re-export env utilities
pub use physthread_core::{env_get, env_get_bool, env_get_in_range, env_get_opt, env_get_str, env_is_set};

// Re-export runtime types
pub use physthread_runtime::{
    current_worker,
    Barrier,
    CriticalSection,
    CriticalSectionGuard,
    CurrentPlatform,
    Event,
    EventGroup,
    OsLock,
    PoolConfig,
    ResetMode,
    Response,
    WorkerIdentity,
    WorkerSlot,
    WorkerThreadPool,
};
pub use physthread_runtime::config::defaults;

// Re-export scheduler layer
pub use physthread_sched::{
    host_max_threads,
    sequential_task_scheduler,
    ConstraintIsland,
    ConstraintSolver,
    ConstraintSolverPool,
    ForBody,
    GaussSeidelSolver,
    PhysicsEnvironment,
    PhysicsHost,
    PoolTaskScheduler,
    RegionBody,
    SchedError,
    SchedResult,
    SequentialTaskScheduler,
    SolveStats,
    SolverLease,
    SolverSettings,
    StepStats,
    SumBody,
    TaskScheduler,
    TaskSchedulerRegistry,
    ThreadCountSetting,
};
#[cfg(feature = "rayon")]
pub use physthread_sched::{rayon_task_scheduler, RayonTaskScheduler};

/// Build a pool that runs `work` on every dispatched input, with no
/// per-worker scratch state.
pub fn simple_pool<I, O, F>(config: &PoolConfig, work: F) -> PoolResult<WorkerThreadPool<I, O>>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> O + Send + Sync + 'static,
{
    WorkerThreadPool::new(config, move |input: I, _: &mut ()| work(input), || ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_of_squares_end_to_end() {
        let config = PoolConfig::new()
            .num_threads(4)
            .unique_name("facade-squares")
            .pin_threads(false)
            .elevate_priority(false);
        let pool = simple_pool(&config, |x: u64| x * x).unwrap();
        for (slot, x) in [1u64, 2, 3, 4].into_iter().enumerate() {
            pool.send_request(0, x, slot);
        }
        let mut results: Vec<u64> = (0..4).filter_map(|_| pool.wait_for_response().output).collect();
        results.sort_unstable();
        assert_eq!(results, vec![1, 4, 9, 16]);
    }
}
