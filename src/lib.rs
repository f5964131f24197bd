//! shardcache - An embeddable sharded in-memory cache
//!
//! Provides per-key TTL expiration and per-shard LRU eviction. Keys are
//! spread over independently locked shards, each with its own background
//! expiration reaper.
//!
//! ```no_run
//! use std::time::Duration;
//! use shardcache::{CacheStore, Config, RemoveReason};
//!
//! let cache = CacheStore::builder(Config::default())
//!     .on_remove(|key: &str, _value: &String, reason: RemoveReason| {
//!         println!("{key} removed: {reason}");
//!     })
//!     .build()?;
//!
//! cache.set("session", "abc".to_string(), Duration::from_secs(30));
//! assert_eq!(cache.get("session")?, "abc");
//! # Ok::<(), shardcache::CacheError>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheBuilder, CacheStats, CacheStore, FxKeyHasher, KeyHasher, RemoveReason};
pub use config::Config;
pub use error::{CacheError, Result};
