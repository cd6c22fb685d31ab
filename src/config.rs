//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Seconds after insertion at which a cache entry expires regardless of use
    pub absolute_expiry: u64,
    /// Seconds of inactivity after which a cache entry expires
    pub sliding_expiry: u64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ABSOLUTE_EXPIRY_SECS` - Absolute cache expiry (default: 3600)
    /// - `CACHE_SLIDING_EXPIRY_SECS` - Sliding cache expiry (default: 600)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Cleanup frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            absolute_expiry: env_or("CACHE_ABSOLUTE_EXPIRY_SECS", defaults.absolute_expiry),
            sliding_expiry: env_or("CACHE_SLIDING_EXPIRY_SECS", defaults.sliding_expiry),
            cleanup_interval: env_or("CACHE_CLEANUP_INTERVAL_SECS", defaults.cleanup_interval),
        }
    }
}

fn env_or(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            absolute_expiry: 3600,
            sliding_expiry: 600,
            cleanup_interval: 60,
        }
    }
}
