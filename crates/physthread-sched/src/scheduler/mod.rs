//! Task scheduler backends
//!
//! A `TaskScheduler` parallelizes a loop over `[begin, end)` by handing
//! contiguous chunks of at most `grain` indices to `body`. Every backend
//! returns only after all chunks have run.

use std::ops::Range;

use physthread_core::constants::{MAX_THREADS, MIN_THREADS};

use crate::error::SchedResult;

mod sequential;
mod pool;
#[cfg(feature = "rayon")]
mod rayon_backend;

pub use sequential::{sequential_task_scheduler, SequentialTaskScheduler};
pub use pool::{PoolTaskScheduler, RegionBody};
#[cfg(feature = "rayon")]
pub use rayon_backend::{rayon_task_scheduler, RayonTaskScheduler};

/// Loop body for `parallel_for`
pub type ForBody<'a> = dyn Fn(Range<usize>) + Sync + 'a;

/// Loop body for `parallel_sum`; partial sums are added in no fixed order
pub type SumBody<'a> = dyn Fn(Range<usize>) -> f64 + Sync + 'a;

pub trait TaskScheduler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Threads the backend currently runs with
    fn num_threads(&self) -> usize;

    /// Most threads the backend will accept
    fn max_num_threads(&self) -> usize;

    /// Resize the backend; `n` is clamped to `[1, max_num_threads()]`.
    fn set_num_threads(&self, n: usize) -> SchedResult<()>;

    fn parallel_for(&self, begin: usize, end: usize, grain: usize, body: &ForBody<'_>);

    fn parallel_sum(&self, begin: usize, end: usize, grain: usize, body: &SumBody<'_>) -> f64;

    /// Free backend resources. Only called for schedulers the registry
    /// allocated itself.
    fn release(&self) {}
}

/// Logical CPUs, clamped to the accepted thread range
pub fn host_max_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_THREADS)
        .clamp(MIN_THREADS, MAX_THREADS)
}

/// Split `[begin, end)` into ranges of at most `grain` indices
pub(crate) fn chunks(begin: usize, end: usize, grain: usize) -> impl Iterator<Item = Range<usize>> {
    let grain = grain.max(1);
    (begin..end).step_by(grain).map(move |start| start..(start + grain).min(end))
}

/// Number of ranges `chunks` yields
pub(crate) fn chunk_count(begin: usize, end: usize, grain: usize) -> usize {
    let grain = grain.max(1);
    end.saturating_sub(begin).div_ceil(grain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_cover_range() {
        let c: Vec<_> = chunks(3, 13, 4).collect();
        assert_eq!(c, vec![3..7, 7..11, 11..13]);
        assert_eq!(chunk_count(3, 13, 4), 3);
        assert_eq!(chunks(5, 5, 4).count(), 0);
        assert_eq!(chunk_count(5, 5, 4), 0);
        assert_eq!(chunk_count(0, 3, 0), 3);
    }

    #[test]
    fn test_host_max_threads_in_range() {
        let n = host_max_threads();
        assert!((MIN_THREADS..=MAX_THREADS).contains(&n));
    }
}
