//! Scheduler layer errors

use core::fmt;

use physthread_core::PoolError;

pub type SchedResult<T> = Result<T, SchedError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// The registry holds no schedulers (not initialised, or shut down)
    NoSchedulers,

    /// Scheduler index past the registered list
    IndexOutOfRange(usize),

    /// Thread / solver count outside `[MIN_THREADS, MAX_THREADS]`
    ThreadCountOutOfRange(usize),

    /// Building or resizing a worker pool failed
    Pool(PoolError),

    /// A third-party backend refused the request
    Backend(String),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::NoSchedulers => write!(f, "no task schedulers registered"),
            SchedError::IndexOutOfRange(i) => write!(f, "task scheduler index {} out of range", i),
            SchedError::ThreadCountOutOfRange(n) => write!(f, "thread count {} out of range", n),
            SchedError::Pool(e) => write!(f, "pool error: {}", e),
            SchedError::Backend(msg) => write!(f, "backend error: {}", msg),
        }
    }
}

impl std::error::Error for SchedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchedError::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PoolError> for SchedError {
    fn from(e: PoolError) -> Self {
        SchedError::Pool(e)
    }
}

/// Check `n` against the accepted thread / solver count range
pub fn check_thread_count(n: usize) -> SchedResult<usize> {
    use physthread_core::constants::{MAX_THREADS, MIN_THREADS};
    if (MIN_THREADS..=MAX_THREADS).contains(&n) {
        Ok(n)
    } else {
        Err(SchedError::ThreadCountOutOfRange(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_thread_count() {
        assert_eq!(check_thread_count(1), Ok(1));
        assert_eq!(check_thread_count(16), Ok(16));
        assert_eq!(check_thread_count(0), Err(SchedError::ThreadCountOutOfRange(0)));
        assert_eq!(check_thread_count(17), Err(SchedError::ThreadCountOutOfRange(17)));
    }

    #[test]
    fn test_pool_error_source() {
        use std::error::Error;
        let e: SchedError = PoolError::NameInUse("x".into()).into();
        assert!(e.source().is_some());
        assert_eq!(format!("{}", e), "pool error: pool name 'x' is already in use");
    }
}
