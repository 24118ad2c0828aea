//! rayon-backed scheduler (the fork-join "OpenMP-style" backend)
//!
//! Discovered rather than allocated: one process-wide instance owning a
//! dedicated rayon thread pool, rebuilt on `set_num_threads`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use physthread_core::constants::MIN_THREADS;
use physthread_core::{kdebug, kwarn};
use rayon::prelude::*;

use super::{chunk_count, chunks, host_max_threads, ForBody, SumBody, TaskScheduler};
use crate::error::{SchedError, SchedResult};

pub struct RayonTaskScheduler {
    pool: RwLock<Option<rayon::ThreadPool>>,
    num_threads: AtomicUsize,
    max_threads: usize,
}

impl RayonTaskScheduler {
    /// Starts with one thread, running inline, until resized
    pub fn new() -> Self {
        Self {
            pool: RwLock::new(None),
            num_threads: AtomicUsize::new(1),
            max_threads: host_max_threads(),
        }
    }

    fn build_pool(n: usize) -> SchedResult<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|i| format!("phys-rayon-{}", i))
            .build()
            .map_err(|e| SchedError::Backend(e.to_string()))
    }
}

impl Default for RayonTaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler for RayonTaskScheduler {
    fn name(&self) -> &'static str {
        "Rayon"
    }

    fn num_threads(&self) -> usize {
        self.num_threads.load(Ordering::Acquire)
    }

    fn max_num_threads(&self) -> usize {
        self.max_threads
    }

    fn set_num_threads(&self, n: usize) -> SchedResult<()> {
        let n = n.clamp(MIN_THREADS, self.max_threads);
        let mut guard = self.pool.write().unwrap_or_else(PoisonError::into_inner);
        if n == 1 {
            *guard = None;
        } else {
            match Self::build_pool(n) {
                Ok(pool) => *guard = Some(pool),
                Err(e) => {
                    kwarn!("rayon pool of {} threads not built: {}", n, e);
                    return Err(e);
                }
            }
        }
        self.num_threads.store(n, Ordering::Release);
        kdebug!("rayon scheduler running {} threads", n);
        Ok(())
    }

    fn parallel_for(&self, begin: usize, end: usize, grain: usize, body: &ForBody<'_>) {
        let guard = self.pool.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(pool) if chunk_count(begin, end, grain) > 1 => {
                let ranges: Vec<_> = chunks(begin, end, grain).collect();
                pool.install(|| ranges.into_par_iter().for_each(body));
            }
            _ => chunks(begin, end, grain).for_each(body),
        }
    }

    fn parallel_sum(&self, begin: usize, end: usize, grain: usize, body: &SumBody<'_>) -> f64 {
        let guard = self.pool.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(pool) if chunk_count(begin, end, grain) > 1 => {
                let ranges: Vec<_> = chunks(begin, end, grain).collect();
                pool.install(|| ranges.into_par_iter().map(body).sum())
            }
            _ => chunks(begin, end, grain).map(body).sum(),
        }
    }
}

/// The process-wide rayon scheduler
pub fn rayon_task_scheduler() -> Arc<dyn TaskScheduler> {
    static RAYON: OnceLock<Arc<RayonTaskScheduler>> = OnceLock::new();
    RAYON.get_or_init(|| Arc::new(RayonTaskScheduler::new())).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_single_threaded() {
        let sched = RayonTaskScheduler::new();
        assert_eq!(sched.num_threads(), 1);
        assert_eq!(sched.parallel_sum(0, 4, 1, &|r| r.len() as f64), 4.0);
    }

    #[test]
    fn test_resize_and_sum() {
        let sched = RayonTaskScheduler::new();
        sched.set_num_threads(sched.max_num_threads()).unwrap();
        assert_eq!(sched.num_threads(), sched.max_num_threads());
        let sum = sched.parallel_sum(0, 1000, 16, &|r| r.map(|i| i as f64).sum());
        assert_eq!(sum, 499_500.0);

        let hits = std::sync::atomic::AtomicUsize::new(0);
        sched.parallel_for(0, 100, 3, &|r| {
            hits.fetch_add(r.len(), Ordering::Relaxed);
        });
        assert_eq!(hits.load(Ordering::Relaxed), 100);
    }
}
