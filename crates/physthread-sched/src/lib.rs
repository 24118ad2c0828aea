//! # physthread-sched
//!
//! Pluggable concurrency backends for the simulation step.
//!
//! - `scheduler` - `TaskScheduler` and its sequential, pool and rayon backends
//! - `registry` - backend enumeration and selection, solver pool ownership
//! - `solver` - constraint islands, the reference solver, the solver pool
//! - `setting` - the runtime thread-count knob
//! - `environment` - simulation environments and the host that resizes them

pub mod error;
pub mod scheduler;
pub mod registry;
pub mod solver;
pub mod setting;
pub mod environment;

pub use error::{SchedError, SchedResult};
pub use scheduler::{
    host_max_threads, sequential_task_scheduler, ForBody, PoolTaskScheduler, RegionBody,
    SequentialTaskScheduler, SumBody, TaskScheduler,
};
#[cfg(feature = "rayon")]
pub use scheduler::{rayon_task_scheduler, RayonTaskScheduler};
pub use registry::TaskSchedulerRegistry;
pub use solver::{
    ConstraintIsland, ConstraintSolver, ConstraintSolverPool, GaussSeidelSolver, SolveStats, SolverLease,
    SolverSettings,
};
pub use setting::ThreadCountSetting;
pub use environment::{PhysicsEnvironment, PhysicsHost, StepStats};
