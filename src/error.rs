//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache (absent, deleted, or past its TTL)
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The cache was configured with unusable parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A caller-supplied compute function failed while filling a miss
    #[error("Compute failed for key {key}: {source}")]
    ComputeFailed {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// The background reaper runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
