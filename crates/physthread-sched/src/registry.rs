//! Task scheduler registry
//!
//! Collects the available backends, picks the active one, and owns the
//! solver pool the simulation draws from. Backends the registry created
//! itself are released on `shutdown()`; process-wide ones it merely
//! discovered are left running.

use std::sync::{Arc, PoisonError, RwLock};

use physthread_core::{kdebug, kinfo, kwarn};
use physthread_runtime::PoolConfig;

use crate::error::{check_thread_count, SchedError, SchedResult};
use crate::scheduler::{sequential_task_scheduler, PoolTaskScheduler, TaskScheduler};
use crate::solver::ConstraintSolverPool;

#[derive(Default)]
struct Registered {
    schedulers: Vec<Arc<dyn TaskScheduler>>,
    allocated: Vec<Arc<PoolTaskScheduler>>,
    active: usize,
}

impl Registered {
    fn add(&mut self, ts: Arc<dyn TaskScheduler>) {
        // A backend that starts at 0 or 1 threads gets the host maximum
        if ts.num_threads() <= 1 {
            if let Err(e) = ts.set_num_threads(ts.max_num_threads()) {
                kwarn!("{} scheduler kept {} threads: {}", ts.name(), ts.num_threads(), e);
            }
        }
        kdebug!("registered {} scheduler ({} threads)", ts.name(), ts.num_threads());
        self.schedulers.push(ts);
    }
}

pub struct TaskSchedulerRegistry {
    state: RwLock<Registered>,
    solver_pool: RwLock<Option<Arc<ConstraintSolverPool>>>,
}

impl TaskSchedulerRegistry {
    /// Register every available backend and build a pool of `solver_count`
    /// constraint solvers.
    ///
    /// Registration order is sequential, the pool-backed default, then
    /// rayon when enabled. The first non-sequential backend becomes active.
    pub fn init(pool_config: &PoolConfig, solver_count: usize) -> SchedResult<Self> {
        let solver_count = check_thread_count(solver_count)?;

        let mut reg = Registered::default();
        reg.add(sequential_task_scheduler());

        let default = Arc::new(PoolTaskScheduler::new(pool_config)?);
        reg.allocated.push(Arc::clone(&default));
        reg.add(default);

        #[cfg(feature = "rayon")]
        reg.add(crate::scheduler::rayon_task_scheduler());

        reg.active = if reg.schedulers.len() > 1 { 1 } else { 0 };
        kinfo!(
            "task scheduler '{}' active ({} registered)",
            reg.schedulers[reg.active].name(),
            reg.schedulers.len()
        );

        let solvers = ConstraintSolverPool::new(solver_count)?;
        Ok(Self {
            state: RwLock::new(reg),
            solver_pool: RwLock::new(Some(Arc::new(solvers))),
        })
    }

    pub fn num_task_schedulers(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).schedulers.len()
    }

    pub fn get_task_scheduler(&self, i: usize) -> SchedResult<Arc<dyn TaskScheduler>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.schedulers.get(i).cloned().ok_or(SchedError::IndexOutOfRange(i))
    }

    pub fn active(&self) -> SchedResult<Arc<dyn TaskScheduler>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.schedulers.get(state.active).cloned().ok_or(SchedError::NoSchedulers)
    }

    pub fn active_index(&self) -> Option<usize> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        (state.active < state.schedulers.len()).then_some(state.active)
    }

    /// Switch backends. Callers must not be inside a parallel call.
    pub fn set_active(&self, i: usize) -> SchedResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.schedulers.is_empty() {
            return Err(SchedError::NoSchedulers);
        }
        let name = state.schedulers.get(i).ok_or(SchedError::IndexOutOfRange(i))?.name();
        state.active = i;
        kinfo!("task scheduler '{}' active", name);
        Ok(())
    }

    /// The pool-backed default scheduler, for manual parallel regions
    pub fn pool_scheduler(&self) -> Option<Arc<PoolTaskScheduler>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.allocated.first().cloned()
    }

    pub fn solver_pool(&self) -> Option<Arc<ConstraintSolverPool>> {
        self.solver_pool.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the solver pool with one of `n` solvers.
    ///
    /// Solves already holding the old pool finish on it.
    pub fn rebuild_solver_pool(&self, n: usize) -> SchedResult<()> {
        let pool = Arc::new(ConstraintSolverPool::new(n)?);
        *self.solver_pool.write().unwrap_or_else(PoisonError::into_inner) = Some(pool);
        kinfo!("solver pool rebuilt with {} solvers", n);
        Ok(())
    }

    /// Release allocated backends and the solver pool. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.schedulers.is_empty() {
            return;
        }
        for ts in state.allocated.drain(..) {
            ts.release();
        }
        state.schedulers.clear();
        state.active = 0;
        drop(state);

        self.solver_pool.write().unwrap_or_else(PoisonError::into_inner).take();
        kinfo!("task scheduler registry shut down");
    }
}

impl Drop for TaskSchedulerRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
