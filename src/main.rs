//! shardcache demo
//!
//! Walks through the cache's behaviour: persistent and expiring keys, LRU
//! eviction, TTL transitions, get-or-set, computed fills, and deletes.

use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shardcache::{CacheStore, Config, RemoveReason};

#[derive(Debug, Clone, Serialize)]
struct Profile {
    name: String,
    score: u32,
}

impl Profile {
    fn new(name: &str, score: u32) -> Self {
        Self {
            name: name.to_string(),
            score,
        }
    }
}

/// Main entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache with a logging removal callback
/// 4. Run each scenario
/// 5. Print aggregated statistics and close the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shardcache=info,shardcache_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: shards={}, capacity={}, verbose={}",
        config.shards, config.capacity, config.verbose
    );

    let cache = CacheStore::builder(config)
        .on_remove(|key: &str, value: &Profile, reason: RemoveReason| {
            info!(key, name = %value.name, %reason, "entry removed");
        })
        .build()
        .context("failed to build cache")?;

    basic(&cache).await;
    lru(&cache);
    ttl_transition(&cache).await;
    get_or_set(&cache);
    compute(&cache);
    delete(&cache);

    let stats = serde_json::to_string_pretty(&cache.stats())?;
    println!("{stats}");

    cache.close();
    info!("Demo complete");
    Ok(())
}

async fn basic(cache: &CacheStore<Profile>) {
    cache.set("profile:expiring", Profile::new("red", 100), Duration::from_millis(500));
    cache.set("profile:persistent", Profile::new("blue", 99), Duration::ZERO);

    for key in ["profile:expiring", "profile:persistent"] {
        match cache.get(key) {
            Ok(profile) => info!(key, ?profile, "found"),
            Err(err) => warn!(%err, "lookup failed"),
        }
    }

    tokio::time::sleep(Duration::from_millis(700)).await;

    if let Err(err) = cache.get("profile:expiring") {
        info!(%err, "expiring key is gone as expected");
    }
}

fn lru(cache: &CacheStore<Profile>) {
    let capacity = cache.capacity() * cache.shard_count();
    for i in 0..=capacity {
        cache.set(format!("lru:{i}"), Profile::new("filler", i as u32), Duration::ZERO);
    }
    info!(count = cache.count(), capacity, "filled past capacity");
}

async fn ttl_transition(cache: &CacheStore<Profile>) {
    cache.set("transition", Profile::new("green", 1), Duration::from_millis(200));
    cache.set("transition", Profile::new("green", 2), Duration::ZERO);

    tokio::time::sleep(Duration::from_millis(300)).await;
    info!(persisted = cache.exists("transition"), "ttl removed by overwrite");
}

fn get_or_set(cache: &CacheStore<Profile>) {
    let first = cache.get_or_set("gos", Profile::new("first", 1), Duration::ZERO);
    let second = cache.get_or_set("gos", Profile::new("second", 2), Duration::ZERO);
    info!(first = %first.name, second = %second.name, "get_or_set keeps the first value");
}

fn compute(cache: &CacheStore<Profile>) {
    let loaded = cache.get_if_absent_compute("computed", Duration::from_secs(5), |key| {
        Ok::<_, anyhow::Error>(Profile::new(key, 42))
    });
    info!(?loaded, "computed on miss");

    let failed = cache.get_if_absent_compute("broken", Duration::ZERO, |_| {
        Err(anyhow::anyhow!("backing store unavailable"))
    });
    if let Err(err) = failed {
        warn!(%err, "compute failed, nothing cached");
    }
}

fn delete(cache: &CacheStore<Profile>) {
    cache.set("doomed", Profile::new("gray", 0), Duration::ZERO);
    if cache.delete("doomed").is_ok() {
        info!("deleted doomed");
    }
    if let Err(err) = cache.delete("doomed") {
        info!(%err, "second delete finds nothing");
    }
}
