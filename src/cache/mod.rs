//! Cache Module
//!
//! Provides sharded in-memory caching with TTL expiration and LRU eviction.

mod entry;
mod hasher;
mod lru;
mod removal;
mod shard;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::time::Duration;

// Re-export public types
pub use entry::CacheEntry;
pub use hasher::{FxKeyHasher, KeyHasher};
pub(crate) use lru::{LruList, Slot};
pub use removal::{noop_callback, RemoveCallback, RemoveReason};
pub use shard::{Shard, SweepOutcome};
pub use stats::CacheStats;
pub use store::{CacheBuilder, CacheStore};

// == Public Constants ==
/// Per-shard capacity used when the configured capacity is zero
pub const DEFAULT_CAPACITY: usize = 100;

/// Reaper sleep when a shard holds no entry with a TTL
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
