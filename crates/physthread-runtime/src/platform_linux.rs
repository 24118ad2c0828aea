//! Linux platform implementation

use nix::sched::{sched_getaffinity, sched_setaffinity, CpuSet};
use nix::unistd::{gettid, Pid};

use physthread_core::{kdebug, PlatformThread, WorkerError};

/// Nice value workers are raised to. Negative values need CAP_SYS_NICE or
/// a matching RLIMIT_NICE; without either the call fails and the worker
/// keeps its inherited priority.
const ELEVATED_NICE: libc::c_int = -2;

/// Linux platform handler
pub struct LinuxPlatform;

impl LinuxPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformThread for LinuxPlatform {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn allowed_cpus(&self) -> Vec<usize> {
        match sched_getaffinity(Pid::from_raw(0)) {
            Ok(set) => (0..CpuSet::count())
                .filter(|&cpu| set.is_set(cpu).unwrap_or(false))
                .collect(),
            Err(e) => {
                kdebug!("sched_getaffinity failed ({}), assuming cpus from 0", e);
                let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
                (0..n).collect()
            }
        }
    }

    fn pin_current_thread(&self, cpu: usize) -> Result<(), WorkerError> {
        let mut set = CpuSet::new();
        set.set(cpu).map_err(|e| WorkerError::AffinityFailed(e as i32))?;
        // pid 0 is the calling thread
        sched_setaffinity(Pid::from_raw(0), &set).map_err(|e| WorkerError::AffinityFailed(e as i32))
    }

    fn raise_current_thread_priority(&self) -> Result<(), WorkerError> {
        let tid = gettid().as_raw() as libc::id_t;
        let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, tid, ELEVATED_NICE) };
        if rc == 0 {
            Ok(())
        } else {
            let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(-1);
            Err(WorkerError::PriorityFailed(errno))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_to_cpu_zero() {
        let platform = LinuxPlatform::new();
        assert!(platform.logical_cpus() >= 1);
        // Runs on a scratch thread so the test harness thread keeps its mask.
        // CPU 0 may be outside a restricted cpuset, so only the error shape is checked.
        let result = std::thread::spawn(move || LinuxPlatform::new().pin_current_thread(0))
            .join()
            .unwrap();
        if let Err(e) = result {
            assert!(matches!(e, WorkerError::AffinityFailed(_)));
        }
    }

    #[test]
    fn test_allowed_cpus_ascending_and_pinnable() {
        let cpus = LinuxPlatform::new().allowed_cpus();
        assert!(!cpus.is_empty());
        assert!(cpus.windows(2).all(|w| w[0] < w[1]));

        // Pin a scratch thread to the last allowed id, which is past
        // cpus.len() - 1 whenever the mask has holes or starts above 0.
        let last = *cpus.last().unwrap();
        let after = std::thread::spawn(move || {
            let platform = LinuxPlatform::new();
            platform.pin_current_thread(last).unwrap();
            platform.allowed_cpus()
        })
        .join()
        .unwrap();
        assert_eq!(after, vec![last]);
    }

    #[test]
    fn test_pin_out_of_range_fails() {
        let platform = LinuxPlatform::new();
        let result = platform.pin_current_thread(CpuSet::count() + 1);
        assert!(matches!(result, Err(WorkerError::AffinityFailed(_))));
    }
}
