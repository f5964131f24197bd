//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// The hasher and removal callback are code-level hooks and are supplied through
/// [`crate::cache::CacheBuilder`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of shards; must be a power of two
    pub shards: usize,
    /// Maximum number of live entries per shard (0 selects the built-in default)
    pub capacity: usize,
    /// Log every per-key event at debug level
    pub verbose: bool,
    /// Worker threads driving the background expiration reapers
    pub reaper_threads: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SHARDCACHE_SHARDS` - Number of shards (default: 1024)
    /// - `SHARDCACHE_CAPACITY` - Entries per shard (default: 32)
    /// - `SHARDCACHE_VERBOSE` - Per-key debug logging (default: false)
    /// - `SHARDCACHE_REAPER_THREADS` - Reaper worker threads (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            shards: env_or("SHARDCACHE_SHARDS", defaults.shards),
            capacity: env_or("SHARDCACHE_CAPACITY", defaults.capacity),
            verbose: env_or("SHARDCACHE_VERBOSE", defaults.verbose),
            reaper_threads: env_or("SHARDCACHE_REAPER_THREADS", defaults.reaper_threads),
        }
    }

    /// A tiny, chatty configuration: two shards of two entries each.
    ///
    /// Small enough that LRU eviction is easy to trigger by hand.
    pub fn for_testing() -> Self {
        Self {
            shards: 2,
            capacity: 2,
            verbose: true,
            reaper_threads: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shards: 1024,
            capacity: 32,
            verbose: false,
            reaper_threads: 1,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.shards, 1024);
        assert_eq!(config.capacity, 32);
        assert!(!config.verbose);
        assert_eq!(config.reaper_threads, 1);
    }

    #[test]
    fn test_config_for_testing() {
        let config = Config::for_testing();
        assert_eq!(config.shards, 2);
        assert_eq!(config.capacity, 2);
        assert!(config.verbose);
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment to avoid races between tests
        env::remove_var("SHARDCACHE_SHARDS");
        env::remove_var("SHARDCACHE_CAPACITY");
        env::remove_var("SHARDCACHE_VERBOSE");
        env::remove_var("SHARDCACHE_REAPER_THREADS");
        assert_eq!(Config::from_env(), Config::default());

        env::set_var("SHARDCACHE_SHARDS", "16");
        env::set_var("SHARDCACHE_CAPACITY", "not-a-number");
        env::set_var("SHARDCACHE_VERBOSE", "true");
        let config = Config::from_env();
        assert_eq!(config.shards, 16);
        assert_eq!(config.capacity, 32);
        assert!(config.verbose);

        env::remove_var("SHARDCACHE_SHARDS");
        env::remove_var("SHARDCACHE_CAPACITY");
        env::remove_var("SHARDCACHE_VERBOSE");
    }
}
