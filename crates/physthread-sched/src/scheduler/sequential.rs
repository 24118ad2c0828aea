//! Single-threaded fallback, always available

use std::sync::{Arc, OnceLock};

use super::{chunks, ForBody, SumBody, TaskScheduler};
use crate::error::SchedResult;

/// Runs every chunk inline on the calling thread.
#[derive(Debug, Default)]
pub struct SequentialTaskScheduler;

impl TaskScheduler for SequentialTaskScheduler {
    fn name(&self) -> &'static str {
        "Sequential"
    }

    fn num_threads(&self) -> usize {
        1
    }

    fn max_num_threads(&self) -> usize {
        1
    }

    fn set_num_threads(&self, _n: usize) -> SchedResult<()> {
        Ok(())
    }

    fn parallel_for(&self, begin: usize, end: usize, grain: usize, body: &ForBody<'_>) {
        for range in chunks(begin, end, grain) {
            body(range);
        }
    }

    fn parallel_sum(&self, begin: usize, end: usize, grain: usize, body: &SumBody<'_>) -> f64 {
        chunks(begin, end, grain).map(body).sum()
    }
}

/// The process-wide sequential scheduler
pub fn sequential_task_scheduler() -> Arc<dyn TaskScheduler> {
    static SEQUENTIAL: OnceLock<Arc<SequentialTaskScheduler>> = OnceLock::new();
    SEQUENTIAL.get_or_init(|| Arc::new(SequentialTaskScheduler)).clone()
}
