//! Simulation environments and their host
//!
//! A `PhysicsHost` owns the scheduler registry, the thread-count setting
//! and every live `PhysicsEnvironment`. Changing the thread count goes
//! through the host, which rebuilds solver pools and tells each live
//! environment directly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use physthread_core::{kdebug, kinfo, SpinLock};
use physthread_runtime::{CriticalSection, PoolConfig};

use crate::error::SchedResult;
use crate::registry::TaskSchedulerRegistry;
use crate::setting::ThreadCountSetting;
use crate::solver::{ConstraintIsland, ConstraintSolverPool, SolverSettings};

// Shared-parameter slots of the step statistics critical section
const PARAM_ISLANDS: usize = 0;
const PARAM_ROWS: usize = 1;
const PARAM_MAX_RESIDUAL: usize = 2;

/// Totals for one `step()`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    pub islands: usize,
    pub rows: usize,
    pub max_residual: f32,
}

/// One simulation world.
pub struct PhysicsEnvironment {
    id: usize,
    registry: Arc<TaskSchedulerRegistry>,
    solvers: RwLock<Arc<ConstraintSolverPool>>,
    thread_count: AtomicUsize,
    settings: SolverSettings,
}

impl PhysicsEnvironment {
    fn new(id: usize, registry: Arc<TaskSchedulerRegistry>, thread_count: usize) -> SchedResult<Self> {
        let solvers = Arc::new(ConstraintSolverPool::new(thread_count)?);
        Ok(Self {
            id,
            registry,
            solvers: RwLock::new(solvers),
            thread_count: AtomicUsize::new(thread_count),
            settings: SolverSettings::default(),
        })
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn thread_count(&self) -> usize {
        self.thread_count.load(Ordering::Acquire)
    }

    pub fn solver_pool(&self) -> Arc<ConstraintSolverPool> {
        Arc::clone(&self.solvers.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace this environment's solver pool with one sized `n`.
    pub fn change_thread_count(&self, n: usize) -> SchedResult<()> {
        let pool = Arc::new(ConstraintSolverPool::new(n)?);
        *self.solvers.write().unwrap_or_else(PoisonError::into_inner) = pool;
        self.thread_count.store(n, Ordering::Release);
        kdebug!("environment {} now solving with {} solvers", self.id, n);
        Ok(())
    }

    /// Solve every island through the active scheduler.
    ///
    /// Each island borrows a solver from this environment's pool for the
    /// duration of its solve. Per-island results are merged under a
    /// critical section owned by this call, so concurrent steps on one
    /// environment keep separate totals.
    pub fn step(&self, islands: &mut [ConstraintIsland]) -> SchedResult<StepStats> {
        let scheduler = self.registry.active()?;
        let solvers = self.solver_pool();
        let merge = CriticalSection::new();
        let cells: Vec<SpinLock<&mut ConstraintIsland>> = islands.iter_mut().map(SpinLock::new).collect();

        scheduler.parallel_for(0, cells.len(), 1, &|range| {
            for i in range {
                let mut island = cells[i].lock();
                let result = {
                    let mut solver = solvers.acquire();
                    solver.solve_island(&mut island, &self.settings)
                };

                let stats = merge.enter();
                stats.set_shared_param(PARAM_ISLANDS, stats.shared_param(PARAM_ISLANDS) + 1);
                stats.set_shared_param(PARAM_ROWS, stats.shared_param(PARAM_ROWS) + result.rows as u32);
                let worst = f32::from_bits(stats.shared_param(PARAM_MAX_RESIDUAL));
                if result.residual > worst {
                    stats.set_shared_param(PARAM_MAX_RESIDUAL, result.residual.to_bits());
                }
            }
        });

        let stats = merge.enter();
        Ok(StepStats {
            islands: stats.shared_param(PARAM_ISLANDS) as usize,
            rows: stats.shared_param(PARAM_ROWS) as usize,
            max_residual: f32::from_bits(stats.shared_param(PARAM_MAX_RESIDUAL)),
        })
    }
}

/// Owner of the registry and of every live environment.
pub struct PhysicsHost {
    registry: Arc<TaskSchedulerRegistry>,
    setting: ThreadCountSetting,
    environments: Mutex<Vec<Arc<PhysicsEnvironment>>>,
    next_id: AtomicUsize,
}

impl PhysicsHost {
    /// Initialise the registry with `setting`'s current thread count as the
    /// solver count.
    pub fn new(pool_config: &PoolConfig, setting: ThreadCountSetting) -> SchedResult<Self> {
        let registry = TaskSchedulerRegistry::init(pool_config, setting.get())?;
        Ok(Self {
            registry: Arc::new(registry),
            setting,
            environments: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        })
    }

    pub fn registry(&self) -> &Arc<TaskSchedulerRegistry> {
        &self.registry
    }

    pub fn thread_count(&self) -> usize {
        self.setting.get()
    }

    pub fn create_environment(&self) -> SchedResult<Arc<PhysicsEnvironment>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let env = Arc::new(PhysicsEnvironment::new(id, Arc::clone(&self.registry), self.setting.get())?);
        self.environments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&env));
        Ok(env)
    }

    /// Stop tracking `env`; returns whether it was live
    pub fn destroy_environment(&self, env: &Arc<PhysicsEnvironment>) -> bool {
        let mut envs = self.environments.lock().unwrap_or_else(PoisonError::into_inner);
        let before = envs.len();
        envs.retain(|e| !Arc::ptr_eq(e, env));
        envs.len() != before
    }

    pub fn active_environment_count(&self) -> usize {
        self.environments.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Apply a new thread count.
    ///
    /// Values outside `[1, 16]` are ignored and `Ok(false)` is returned.
    /// Otherwise the registry's solver pool is rebuilt and every live
    /// environment is told to resize.
    pub fn set_thread_count(&self, n: usize) -> SchedResult<bool> {
        if !self.setting.set(n) {
            return Ok(false);
        }
        kinfo!("Resizing to {} threads", n);
        self.registry.rebuild_solver_pool(n)?;
        let envs = self.environments.lock().unwrap_or_else(PoisonError::into_inner).clone();
        for env in &envs {
            env.change_thread_count(n)?;
        }
        Ok(true)
    }

    /// Drop every environment and shut the registry down. Idempotent.
    pub fn shutdown(&self) {
        self.environments.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.registry.shutdown();
    }
}

impl Drop for PhysicsHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}
