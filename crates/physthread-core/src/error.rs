//! Error types for the worker pool
//!
//! Only runtime conditions are errors. Contract violations by the
//! coordinating code (bad task id, double dispatch, zero threads) are
//! assertions, not variants here.

use core::fmt;

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors that can occur while building or tearing down a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Configuration rejected by `validate()`
    InvalidConfig(&'static str),

    /// Another live pool already uses this unique name
    NameInUse(String),

    /// Worker thread error
    Worker(WorkerError),

    /// Platform-specific error (raw OS error code)
    Platform(i32),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::InvalidConfig(msg) => write!(f, "invalid pool configuration: {}", msg),
            PoolError::NameInUse(name) => write!(f, "pool name '{}' is already in use", name),
            PoolError::Worker(e) => write!(f, "worker error: {}", e),
            PoolError::Platform(code) => write!(f, "platform error: {}", code),
        }
    }
}

impl std::error::Error for PoolError {}

/// Worker thread related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Failed to spawn worker thread (raw OS error code, -1 if unknown)
    SpawnFailed(i32),

    /// Failed to pin the thread to a CPU
    AffinityFailed(i32),

    /// Failed to raise the thread's scheduling priority
    PriorityFailed(i32),

    /// Worker thread panicked outside a unit of work
    Panicked,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::SpawnFailed(code) => write!(f, "failed to spawn worker thread (os error {})", code),
            WorkerError::AffinityFailed(code) => write!(f, "failed to set thread affinity (os error {})", code),
            WorkerError::PriorityFailed(code) => write!(f, "failed to raise thread priority (os error {})", code),
            WorkerError::Panicked => write!(f, "worker thread panicked"),
        }
    }
}

impl From<WorkerError> for PoolError {
    fn from(e: WorkerError) -> Self {
        PoolError::Worker(e)
    }
}

impl From<std::io::Error> for PoolError {
    fn from(e: std::io::Error) -> Self {
        PoolError::Worker(WorkerError::SpawnFailed(e.raw_os_error().unwrap_or(-1)))
    }
}
