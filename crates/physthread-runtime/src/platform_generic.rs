//! Portable platform implementation
//!
//! No affinity or priority control; both requests succeed as no-ops.

use physthread_core::{PlatformThread, WorkerError};

pub struct GenericPlatform;

impl GenericPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenericPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformThread for GenericPlatform {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn allowed_cpus(&self) -> Vec<usize> {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        (0..n).collect()
    }

    fn pin_current_thread(&self, _cpu: usize) -> Result<(), WorkerError> {
        Ok(())
    }

    fn raise_current_thread_priority(&self) -> Result<(), WorkerError> {
        Ok(())
    }
}
