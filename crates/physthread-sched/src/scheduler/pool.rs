//! Scheduler backed by a `WorkerThreadPool`
//!
//! The calling thread acts as the pool's coordinator: it hands one chunk to
//! each idle slot, refills slots as their responses come back, and returns
//! once every chunk has been collected.

use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use physthread_core::constants::MIN_THREADS;
use physthread_core::{kdebug, kinfo};
use physthread_runtime::{current_worker, Barrier, PoolConfig, WorkerThreadPool};

use super::{chunk_count, chunks, host_max_threads, ForBody, SumBody, TaskScheduler};
use crate::error::SchedResult;

/// Body of a manual parallel region: `(worker_index, barrier)`
pub type RegionBody<'a> = dyn Fn(usize, &Barrier) + Sync + 'a;

#[derive(Clone, Copy)]
enum Body {
    For(&'static ForBody<'static>),
    Sum(&'static SumBody<'static>),
    Region(&'static RegionBody<'static>, &'static Barrier),
}

struct Job {
    body: Body,
    range: Range<usize>,
}

fn run_job(job: Job, _scratch: &mut ()) -> f64 {
    match job.body {
        Body::For(f) => {
            f(job.range);
            0.0
        }
        Body::Sum(f) => f(job.range),
        Body::Region(f, barrier) => {
            let index = job.range.start;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(index, barrier))) {
                // The other participants may be parked in sync()
                barrier.abort();
                panic::resume_unwind(payload);
            }
            0.0
        }
    }
}

// The `'static` in these casts is never observed: `run_jobs` collects every
// dispatched job before returning, so no worker touches a body after the
// caller's borrow ends.
unsafe fn erase_for<'a>(f: &'a ForBody<'a>) -> &'static ForBody<'static> {
    std::mem::transmute::<&'a ForBody<'a>, &'static ForBody<'static>>(f)
}

unsafe fn erase_sum<'a>(f: &'a SumBody<'a>) -> &'static SumBody<'static> {
    std::mem::transmute::<&'a SumBody<'a>, &'static SumBody<'static>>(f)
}

unsafe fn erase_region<'a>(
    f: &'a RegionBody<'a>,
    barrier: &'a Barrier,
) -> (&'static RegionBody<'static>, &'static Barrier) {
    (
        std::mem::transmute::<&'a RegionBody<'a>, &'static RegionBody<'static>>(f),
        std::mem::transmute::<&'a Barrier, &'static Barrier>(barrier),
    )
}

static NEXT_INSTANCE: AtomicUsize = AtomicUsize::new(0);

/// The default parallel backend.
///
/// Resizing tears the pool down and builds a new one; `release()` drops it
/// and later calls run inline.
pub struct PoolTaskScheduler {
    pool: Mutex<Option<WorkerThreadPool<Job, f64>>>,
    pool_id: AtomicU64,
    num_threads: AtomicUsize,
    max_threads: usize,
    config: PoolConfig,
}

impl PoolTaskScheduler {
    /// Start a pool of `config.num_threads` workers, clamped to the host's
    /// thread limit.
    ///
    /// The pool name is `config.unique_name` with an instance suffix so
    /// several schedulers can coexist.
    pub fn new(config: &PoolConfig) -> SchedResult<Self> {
        let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        let config = config
            .clone()
            .unique_name(format!("{}-sched{}", config.unique_name, instance));
        let max_threads = host_max_threads();
        let n = config.num_threads.clamp(MIN_THREADS, max_threads);

        let sched = Self {
            pool: Mutex::new(None),
            pool_id: AtomicU64::new(0),
            num_threads: AtomicUsize::new(0),
            max_threads,
            config,
        };
        sched.rebuild(n)?;
        Ok(sched)
    }

    fn rebuild(&self, n: usize) -> SchedResult<()> {
        let mut guard = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        // The old pool must be gone before the new one claims the same name
        drop(guard.take());
        self.pool_id.store(0, Ordering::Release);

        let pool = WorkerThreadPool::new(&self.config.clone().num_threads(n), run_job, || ())?;
        self.pool_id.store(pool.id(), Ordering::Release);
        self.num_threads.store(n, Ordering::Release);
        *guard = Some(pool);
        kdebug!("scheduler pool '{}' running {} threads", self.config.unique_name, n);
        Ok(())
    }

    /// True on one of this scheduler's own workers, where dispatching would
    /// wait on itself
    fn on_own_worker(&self) -> bool {
        let id = self.pool_id.load(Ordering::Acquire);
        id != 0 && current_worker().is_some_and(|w| w.pool_id == id)
    }

    /// Dispatch every job, keeping all slots busy, and collect them all.
    ///
    /// Returns the sum of outputs and whether any job panicked.
    fn run_jobs(pool: &WorkerThreadPool<Job, f64>, jobs: impl Iterator<Item = Job>) -> (f64, bool) {
        let mut idle: Vec<usize> = (0..pool.num_tasks()).rev().collect();
        let mut total = 0.0;
        let mut panicked = false;
        let mut collect = |idle: &mut Vec<usize>| {
            let r = pool.wait_for_response();
            match r.output {
                Some(v) => total += v,
                None => panicked = true,
            }
            idle.push(r.task_id);
        };

        for job in jobs {
            if idle.is_empty() {
                collect(&mut idle);
            }
            if let Some(slot) = idle.pop() {
                pool.send_request(0, job, slot);
            }
        }
        while pool.outstanding() > 0 {
            collect(&mut idle);
        }
        (total, panicked)
    }

    fn dispatch(&self, begin: usize, end: usize, grain: usize, body: Body) -> Option<f64> {
        let guard = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        let pool = guard.as_ref()?;
        let jobs = chunks(begin, end, grain).map(|range| Job { body, range });
        let (total, panicked) = Self::run_jobs(pool, jobs);
        drop(guard);
        if panicked {
            panic!("task body panicked on a worker of '{}'", self.config.unique_name);
        }
        Some(total)
    }

    /// Run `body(worker_index, barrier)` once on every worker.
    ///
    /// The barrier is sized to the worker count, so the body may `sync()` on
    /// it any number of times provided every worker does the same. If any
    /// body panics the barrier is aborted, so the remaining workers run to
    /// the end of their bodies without further rendezvous.
    ///
    /// # Panics
    ///
    /// If called from one of this scheduler's workers, or if `body` panicked.
    pub fn parallel_region(&self, body: &RegionBody<'_>) {
        assert!(!self.on_own_worker(), "parallel_region called from inside the region");
        let guard = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(pool) = guard.as_ref() else {
            body(0, &Barrier::new());
            return;
        };
        let barrier = pool.create_barrier();
        // Safety: every job is collected by run_jobs before `barrier` and
        // `body` go out of scope.
        let (f, b) = unsafe { erase_region(body, &barrier) };
        let jobs = (0..pool.num_tasks()).map(|i| Job {
            body: Body::Region(f, b),
            range: i..i + 1,
        });
        let (_, panicked) = Self::run_jobs(pool, jobs);
        drop(guard);
        if panicked {
            panic!("parallel region body panicked on a worker of '{}'", self.config.unique_name);
        }
    }
}

impl TaskScheduler for PoolTaskScheduler {
    fn name(&self) -> &'static str {
        "ThreadPool"
    }

    fn num_threads(&self) -> usize {
        self.num_threads.load(Ordering::Acquire)
    }

    fn max_num_threads(&self) -> usize {
        self.max_threads
    }

    fn set_num_threads(&self, n: usize) -> SchedResult<()> {
        let n = n.clamp(MIN_THREADS, self.max_threads);
        if n == self.num_threads() && self.pool_id.load(Ordering::Acquire) != 0 {
            return Ok(());
        }
        kinfo!("{} scheduler resizing to {} threads", self.name(), n);
        self.rebuild(n)
    }

    fn parallel_for(&self, begin: usize, end: usize, grain: usize, body: &ForBody<'_>) {
        if chunk_count(begin, end, grain) <= 1 || self.on_own_worker() {
            chunks(begin, end, grain).for_each(body);
            return;
        }
        // Safety: dispatch() collects every job before returning
        let f = unsafe { erase_for(body) };
        if self.dispatch(begin, end, grain, Body::For(f)).is_none() {
            chunks(begin, end, grain).for_each(body);
        }
    }

    fn parallel_sum(&self, begin: usize, end: usize, grain: usize, body: &SumBody<'_>) -> f64 {
        if chunk_count(begin, end, grain) <= 1 || self.on_own_worker() {
            return chunks(begin, end, grain).map(body).sum();
        }
        // Safety: dispatch() collects every job before returning
        let f = unsafe { erase_sum(body) };
        match self.dispatch(begin, end, grain, Body::Sum(f)) {
            Some(total) => total,
            None => chunks(begin, end, grain).map(body).sum(),
        }
    }

    fn release(&self) {
        let mut guard = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            self.pool_id.store(0, Ordering::Release);
            kdebug!("scheduler pool '{}' released", self.config.unique_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn scheduler(n: usize) -> PoolTaskScheduler {
        let config = PoolConfig::new()
            .num_threads(n)
            .unique_name("pool-sched-test")
            .pin_threads(false)
            .elevate_priority(false);
        PoolTaskScheduler::new(&config).unwrap()
    }

    #[test]
    fn test_parallel_for_visits_every_index_once() {
        let sched = scheduler(4);
        let hits: Vec<AtomicUsize> = (0..1000).map(|_| AtomicUsize::new(0)).collect();
        sched.parallel_for(0, 1000, 7, &|r| {
            for i in r {
                hits[i].fetch_add(1, Ordering::Relaxed);
            }
        });
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn test_parallel_sum() {
        let sched = scheduler(3);
        let sum = sched.parallel_sum(1, 101, 10, &|r| r.map(|i| i as f64).sum());
        assert_eq!(sum, 5050.0);
        assert_eq!(sched.parallel_sum(0, 0, 10, &|_| 1.0), 0.0);
    }

    #[test]
    fn test_set_num_threads_rebuilds() {
        let sched = scheduler(2);
        let max = sched.max_num_threads();
        sched.set_num_threads(max + 10).unwrap();
        assert_eq!(sched.num_threads(), max);
        sched.set_num_threads(0).unwrap();
        assert_eq!(sched.num_threads(), 1);
        assert_eq!(sched.parallel_sum(0, 10, 1, &|r| r.len() as f64), 10.0);
    }

    #[test]
    fn test_nested_call_runs_inline() {
        let sched = scheduler(2);
        let total = AtomicUsize::new(0);
        sched.parallel_for(0, 4, 1, &|outer| {
            sched.parallel_for(0, 8, 2, &|inner| {
                total.fetch_add(inner.len() * outer.len(), Ordering::Relaxed);
            });
        });
        assert_eq!(total.load(Ordering::Relaxed), 32);
    }

    #[test]
    fn test_panicking_region_does_not_wedge_scheduler() {
        let sched = scheduler(3);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            sched.parallel_region(&|index, barrier| {
                if index == 0 {
                    panic!("region body failed");
                }
                barrier.sync();
                barrier.sync();
            });
        }));
        assert!(result.is_err());

        // pool lock released and workers idle again
        assert_eq!(sched.parallel_sum(0, 64, 4, &|r| r.len() as f64), 64.0);
        sched.set_num_threads(2).unwrap();
        sched.release();
    }

    #[test]
    fn test_parallel_region_barrier() {
        let sched = scheduler(3);
        let n = sched.num_threads();
        let phase_one = AtomicUsize::new(0);
        let seen = Mutex::new(Vec::new());
        sched.parallel_region(&|index, barrier| {
            phase_one.fetch_add(1, Ordering::SeqCst);
            barrier.sync();
            assert_eq!(phase_one.load(Ordering::SeqCst), n);
            seen.lock().unwrap().push(index);
        });
        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn test_release_falls_back_inline() {
        let sched = scheduler(2);
        sched.release();
        sched.release();
        assert_eq!(sched.parallel_sum(0, 6, 2, &|r| r.len() as f64), 6.0);
        sched.set_num_threads(2).unwrap();
        assert_eq!(sched.parallel_sum(0, 6, 2, &|r| r.len() as f64), 6.0);
    }

    #[test]
    #[should_panic(expected = "task body panicked")]
    fn test_body_panic_propagates() {
        let sched = scheduler(2);
        sched.parallel_for(0, 4, 1, &|r| {
            if r.start == 2 {
                panic!("boom");
            }
        });
    }
}
