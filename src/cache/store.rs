//! Cache Store Module
//!
//! Routes each key to one shard by hash and fans whole-cache operations out
//! across every shard.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;
use tracing::info;

use crate::cache::{
    noop_callback, CacheStats, FxKeyHasher, KeyHasher, RemoveCallback, RemoveReason, Shard,
    DEFAULT_CAPACITY,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_reaper;

// == Cache Builder ==
/// Builds a [`CacheStore`] from a [`Config`] plus optional hooks.
pub struct CacheBuilder<V> {
    config: Config,
    hasher: Option<Arc<dyn KeyHasher>>,
    on_remove: Option<RemoveCallback<V>>,
}

impl<V> CacheBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: Config) -> Self {
        Self {
            config,
            hasher: None,
            on_remove: None,
        }
    }

    /// Replaces the default [`FxKeyHasher`] used for shard routing.
    pub fn hasher<H>(mut self, hasher: H) -> Self
    where
        H: KeyHasher + 'static,
    {
        self.hasher = Some(Arc::new(hasher));
        self
    }

    /// Sets the callback fired for every eviction, expiration, and delete.
    ///
    /// See [`RemoveCallback`] for the locking caveats.
    pub fn on_remove<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &V, RemoveReason) + Send + Sync + 'static,
    {
        self.on_remove = Some(Arc::new(callback));
        self
    }

    // == Build ==
    /// Validates the configuration, creates the shards, and starts one
    /// expiration reaper per shard.
    ///
    /// # Errors
    /// - `InvalidConfiguration` if the shard count is not a power of two
    /// - `Runtime` if the reaper runtime cannot be started
    pub fn build(self) -> Result<CacheStore<V>> {
        let Config {
            shards,
            capacity,
            verbose,
            reaper_threads,
        } = self.config;

        if !shards.is_power_of_two() {
            return Err(CacheError::InvalidConfiguration(format!(
                "shard count must be a power of two, got {shards}"
            )));
        }
        let capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };

        let runtime = Builder::new_multi_thread()
            .worker_threads(reaper_threads.max(1))
            .thread_name("shardcache-reaper")
            .enable_time()
            .build()?;

        let (shutdown_tx, _) = watch::channel(false);
        let on_remove = self.on_remove.unwrap_or_else(noop_callback);
        let shard_list: Vec<Arc<Shard<V>>> = (0..shards)
            .map(|id| {
                let (shard, wake_rx) = Shard::new(id, capacity, on_remove.clone(), verbose);
                let shard = Arc::new(shard);
                spawn_reaper(
                    runtime.handle(),
                    Arc::clone(&shard),
                    wake_rx,
                    shutdown_tx.subscribe(),
                );
                shard
            })
            .collect();

        info!(shards, capacity, "cache store initialized");

        Ok(CacheStore {
            shards: shard_list.into_boxed_slice(),
            shard_mask: (shards - 1) as u64,
            hasher: self.hasher.unwrap_or_else(|| Arc::new(FxKeyHasher)),
            shutdown_tx,
            runtime: Some(runtime),
        })
    }
}

// == Cache Store ==
/// Sharded cache with per-key TTL and per-shard LRU eviction.
///
/// All operations are synchronous. Each key maps to exactly one shard; no
/// operation ever holds more than one shard lock at a time.
pub struct CacheStore<V> {
    shards: Box<[Arc<Shard<V>>]>,
    /// `shards.len() - 1`; valid because the count is a power of two
    shard_mask: u64,
    hasher: Arc<dyn KeyHasher>,
    shutdown_tx: watch::Sender<bool>,
    /// Drives the reapers; `None` only while dropping
    runtime: Option<Runtime>,
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a store with the default hasher and no removal callback.
    pub fn new(config: Config) -> Result<Self> {
        CacheBuilder::new(config).build()
    }

    pub fn builder(config: Config) -> CacheBuilder<V> {
        CacheBuilder::new(config)
    }

    // == Route ==
    /// Index of the shard that owns `key`.
    pub fn route(&self, key: &str) -> usize {
        (self.hasher.hash_key(key) & self.shard_mask) as usize
    }

    fn shard(&self, key: &str) -> &Shard<V> {
        &self.shards[self.route(key)]
    }

    /// Stores `value` under `key`. A zero `ttl` never expires.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        self.shard(&key).set(key, value, ttl);
    }

    /// Retrieves a value, marking it most recently used in its shard.
    pub fn get(&self, key: &str) -> Result<V> {
        self.shard(key).get(key)
    }

    /// Returns the existing value, or stores `value` if the key is absent.
    pub fn get_or_set(&self, key: &str, value: V, ttl: Duration) -> V {
        self.shard(key).get_or_set(key, value, ttl)
    }

    /// Returns the existing value, or stores the result of `compute`.
    ///
    /// `compute` runs under the shard lock: concurrent misses on the same
    /// shard wait for it rather than computing twice.
    pub fn get_if_absent_compute<F, E>(&self, key: &str, ttl: Duration, compute: F) -> Result<V>
    where
        F: FnOnce(&str) -> std::result::Result<V, E>,
        E: Into<anyhow::Error>,
    {
        self.shard(key).get_if_absent_compute(key, ttl, compute)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.shard(key).delete(key)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.shard(key).exists(key)
    }

    // == Aggregates ==
    /// Total entries across shards, including expired ones not yet swept.
    pub fn count(&self) -> usize {
        self.shards.iter().map(|shard| shard.count()).sum()
    }

    /// Visits every unexpired entry once. Shards are visited one at a time.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &V),
    {
        for shard in self.shards.iter() {
            shard.for_each(&mut visitor);
        }
    }

    /// Counters summed across shards.
    pub fn stats(&self) -> CacheStats {
        self.shards
            .iter()
            .fold(CacheStats::new(), |mut total, shard| {
                total.merge(&shard.stats());
                total
            })
    }

    /// Verifies every shard's internal invariants.
    pub fn check(&self) -> std::result::Result<(), String> {
        for shard in self.shards.iter() {
            shard
                .check()
                .map_err(|problem| format!("shard {}: {problem}", shard.id()))?;
        }
        Ok(())
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Per-shard capacity after defaults were applied.
    pub fn capacity(&self) -> usize {
        self.shards.first().map_or(0, |shard| shard.capacity())
    }

    // == Close ==
    /// Signals every reaper to flush its shard and stop.
    ///
    /// Calling it again has no effect. Using the store after closing is
    /// allowed but entries are no longer expired in the background.
    pub fn close(&self) {
        let was_closed = self.shutdown_tx.send_replace(true);
        if !was_closed {
            info!(shards = self.shards.len(), "cache store closing");
        }
    }
}

impl<V> fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("shards", &self.shards.len())
            .field("closed", &*self.shutdown_tx.borrow())
            .finish()
    }
}

impl<V> Drop for CacheStore<V> {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
        // Never blocks, so dropping inside an async context is fine
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
