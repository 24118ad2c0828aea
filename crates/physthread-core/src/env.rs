//! Environment variable utilities
//!
//! All runtime knobs are read through these helpers so that a bad value
//! always degrades to the default instead of failing startup.
//!
//! ```ignore
//! use physthread_core::env::{env_get, env_get_bool, env_get_in_range};
//!
//! let stack: usize = env_get("PHYS_THREAD_STACK_SIZE", 256 * 1024);
//! let pin = env_get_bool("PHYS_PIN_THREADS", true);
//! let threads = env_get_in_range("PHYS_NUM_THREADS", 8usize, 1..=16);
//! ```

use std::ops::RangeInclusive;
use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable parsed as T, accepted only inside `range`.
///
/// Unset, unparsable and out-of-range values all yield `default`.
pub fn env_get_in_range<T>(key: &str, default: T, range: RangeInclusive<T>) -> T
where
    T: FromStr + PartialOrd,
{
    match env_get_opt::<T>(key) {
        Some(v) if range.contains(&v) => v,
        _ => default,
    }
}

/// Get environment variable as boolean
///
/// "1", "true", "yes", "on" (case-insensitive) are true, "0", "false",
/// "no", "off" are false. Anything else, including unset, is the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Get environment variable as optional value
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as string, or return default
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var(key).is_ok()
}
