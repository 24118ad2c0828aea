//! Worker pool configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env()` only)
//! 3. User's config file named by `PHYS_CONFIG_RS` at build time
//! 4. Library defaults
//!
//! ```rust,ignore
//! use physthread_runtime::config::PoolConfig;
//!
//! let config = PoolConfig::from_env()
//!     .num_threads(4)
//!     .unique_name("narrowphase");
//! ```

pub mod defaults;

use physthread_core::constants::{MAX_THREADS, MIN_THREADS};
use physthread_core::env::{env_get, env_get_bool, env_get_in_range, env_get_str};

/// Construction parameters for a `WorkerThreadPool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of persistent workers
    pub num_threads: usize,
    /// Native stack size per worker, in bytes
    pub stack_size: usize,
    /// Prefix for thread and signal names; unique among live pools
    pub unique_name: String,
    /// Pin worker `i` to logical CPU `i`
    pub pin_threads: bool,
    /// Raise workers to the highest ordinary scheduling priority
    pub elevate_priority: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Defaults with environment overrides.
    ///
    /// - `PHYS_NUM_THREADS` - worker count, ignored outside `[MIN_THREADS, MAX_THREADS]`
    /// - `PHYS_THREAD_STACK_SIZE` - stack bytes per worker
    /// - `PHYS_UNIQUE_NAME` - name prefix
    /// - `PHYS_PIN_THREADS` - 0/1
    /// - `PHYS_ELEVATE_PRIORITY` - 0/1
    pub fn from_env() -> Self {
        Self {
            num_threads: env_get_in_range(
                "PHYS_NUM_THREADS",
                defaults::NUM_THREADS,
                MIN_THREADS..=MAX_THREADS,
            ),
            stack_size: env_get("PHYS_THREAD_STACK_SIZE", defaults::THREAD_STACK_SIZE),
            unique_name: env_get_str("PHYS_UNIQUE_NAME", defaults::UNIQUE_NAME),
            pin_threads: env_get_bool("PHYS_PIN_THREADS", defaults::PIN_THREADS),
            elevate_priority: env_get_bool("PHYS_ELEVATE_PRIORITY", defaults::ELEVATE_PRIORITY),
        }
    }

    /// Library defaults only, no environment lookups.
    pub fn new() -> Self {
        Self {
            num_threads: defaults::NUM_THREADS,
            stack_size: defaults::THREAD_STACK_SIZE,
            unique_name: defaults::UNIQUE_NAME.to_string(),
            pin_threads: defaults::PIN_THREADS,
            elevate_priority: defaults::ELEVATE_PRIORITY,
        }
    }

    // Builder methods

    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = n;
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    pub fn unique_name(mut self, name: impl Into<String>) -> Self {
        self.unique_name = name.into();
        self
    }

    pub fn pin_threads(mut self, enable: bool) -> Self {
        self.pin_threads = enable;
        self
    }

    pub fn elevate_priority(mut self, enable: bool) -> Self {
        self.elevate_priority = enable;
        self
    }

    /// Validate configuration.
    ///
    /// A thread count above the core count is accepted (oversubscription).
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.num_threads == 0 {
            return Err("num_threads must be at least 1");
        }
        if self.stack_size != 0 && self.stack_size < 16 * 1024 {
            return Err("stack_size must be 0 (platform default) or at least 16 KiB");
        }
        if self.unique_name.is_empty() {
            return Err("unique_name must not be empty");
        }
        if self.unique_name.contains('\0') {
            return Err("unique_name must not contain NUL");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let c = PoolConfig::new();
        assert_eq!(c.num_threads, defaults::NUM_THREADS);
        assert_eq!(c.unique_name, defaults::UNIQUE_NAME);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validate() {
        let c = PoolConfig::new().num_threads(0);
        assert_eq!(c.validate(), Err("num_threads must be at least 1"));

        let c = PoolConfig::new().num_threads(64);
        assert!(c.validate().is_ok(), "oversubscription is allowed");

        let c = PoolConfig::new().unique_name("");
        assert!(c.validate().is_err());

        let c = PoolConfig::new().stack_size(4096);
        assert!(c.validate().is_err());

        let c = PoolConfig::new().stack_size(0).pin_threads(false).elevate_priority(false);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_default_bounds() {
        assert!((MIN_THREADS..=MAX_THREADS).contains(&defaults::NUM_THREADS));
    }

    // Only test in this crate touching PHYS_NUM_THREADS
    #[test]
    fn test_env_thread_count_shares_core_bounds() {
        std::env::set_var("PHYS_NUM_THREADS", MAX_THREADS.to_string());
        assert_eq!(PoolConfig::from_env().num_threads, MAX_THREADS);

        std::env::set_var("PHYS_NUM_THREADS", (MAX_THREADS + 1).to_string());
        assert_eq!(PoolConfig::from_env().num_threads, defaults::NUM_THREADS);

        std::env::set_var("PHYS_NUM_THREADS", (MIN_THREADS - 1).to_string());
        assert_eq!(PoolConfig::from_env().num_threads, defaults::NUM_THREADS);
        std::env::remove_var("PHYS_NUM_THREADS");
    }
}
