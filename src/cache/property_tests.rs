//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache's invariants over random operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::cache::{CacheStore, RemoveReason, Shard, DEFAULT_SWEEP_INTERVAL};
use crate::config::Config;

// == Strategies ==
/// Generates valid cache keys (non-empty)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,16}".prop_map(|s| s)
}

fn valid_value_strategy() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// TTLs long enough that nothing expires during a test case
fn ttl_strategy() -> impl Strategy<Value = Duration> {
    prop_oneof![
        Just(Duration::ZERO),
        (60u64..3600).prop_map(Duration::from_secs),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: u64, ttl: Duration },
    Get { key: String },
    GetOrSet { key: String, value: u64, ttl: Duration },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy(), ttl_strategy())
            .prop_map(|(key, value, ttl)| CacheOp::Set { key, value, ttl }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        (valid_key_strategy(), valid_value_strategy(), ttl_strategy())
            .prop_map(|(key, value, ttl)| CacheOp::GetOrSet { key, value, ttl }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn single_shard(capacity: usize) -> Shard<u64> {
    Shard::new(0, capacity, crate::cache::noop_callback(), false).0
}

fn unique(keys: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Round trip: a persistent set is immediately readable
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let shard = single_shard(16);

        shard.set(key.clone(), value, Duration::ZERO);

        prop_assert_eq!(shard.get(&key).unwrap(), value, "Round-trip value mismatch");
    }

    // Delete removes the entry
    #[test]
    fn prop_delete_removes_entry(key in valid_key_strategy(), value in valid_value_strategy()) {
        let shard = single_shard(16);

        shard.set(key.clone(), value, Duration::ZERO);
        prop_assert!(shard.delete(&key).is_ok());

        prop_assert!(shard.get(&key).is_err(), "Key should not exist after delete");
        prop_assert!(shard.check().is_ok());
    }

    // get_or_set on a hit returns the stored value and leaves it untouched
    #[test]
    fn prop_get_or_set_idempotent_on_hit(
        key in valid_key_strategy(),
        v1 in valid_value_strategy(),
        v2 in valid_value_strategy(),
        ttl in ttl_strategy(),
    ) {
        let shard = single_shard(16);

        shard.set(key.clone(), v1, Duration::ZERO);
        prop_assert_eq!(shard.get_or_set(&key, v2, ttl), v1);
        prop_assert_eq!(shard.get(&key).unwrap(), v1);

        // Still persistent: nothing for the reaper to schedule
        let before = Instant::now();
        prop_assert!(shard.sweep_expired().next_sweep >= before + DEFAULT_SWEEP_INTERVAL);
    }

    // Capacity: the shard never holds more than its capacity and every
    // insert past it evicts exactly one entry
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..200)
    ) {
        let capacity = 16;
        let evictions = Arc::new(Mutex::new(0usize));
        let counter = evictions.clone();
        let (shard, _wake_rx) = Shard::new(
            0,
            capacity,
            Arc::new(move |_: &str, _: &u64, reason: RemoveReason| {
                if reason == RemoveReason::NoSpace {
                    *counter.lock() += 1;
                }
            }),
            false,
        );

        let mut expected_evictions = 0;
        for (key, value) in entries {
            if !shard.exists(&key) && shard.count() == capacity {
                expected_evictions += 1;
            }
            shard.set(key, value, Duration::ZERO);
            prop_assert!(shard.count() <= capacity, "Shard size {} exceeds {}", shard.count(), capacity);
        }

        prop_assert_eq!(*evictions.lock(), expected_evictions);
    }

    // LRU: with no reads, C+1 distinct inserts evict the first key
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::vec(valid_key_strategy(), 3..10),
        new_key in valid_key_strategy(),
        new_value in valid_value_strategy()
    ) {
        let unique_keys = unique(initial_keys);
        prop_assume!(unique_keys.len() >= 2);
        prop_assume!(!unique_keys.contains(&new_key));

        let shard = single_shard(unique_keys.len());
        for key in &unique_keys {
            shard.set(key.clone(), 0, Duration::ZERO);
        }

        shard.set(new_key.clone(), new_value, Duration::ZERO);

        prop_assert!(!shard.exists(&unique_keys[0]), "Oldest key should have been evicted");
        prop_assert!(shard.exists(&new_key));
        for key in unique_keys.iter().skip(1) {
            prop_assert!(shard.exists(key), "Key '{}' should still exist", key);
        }
    }

    // LRU: a read promotes the key so the next-oldest is evicted instead
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::vec(valid_key_strategy(), 3..8),
        new_key in valid_key_strategy(),
    ) {
        let unique_keys = unique(keys);
        prop_assume!(unique_keys.len() >= 3);
        prop_assume!(!unique_keys.contains(&new_key));

        let shard = single_shard(unique_keys.len());
        for key in &unique_keys {
            shard.set(key.clone(), 0, Duration::ZERO);
        }

        prop_assert!(shard.get(&unique_keys[0]).is_ok());
        shard.set(new_key.clone(), 1, Duration::ZERO);

        prop_assert!(shard.exists(&unique_keys[0]), "Accessed key should survive");
        prop_assert!(!shard.exists(&unique_keys[1]), "Next-oldest key should be evicted");
    }

    // Structure stays consistent under any op sequence, and TTL transitions
    // keep the expiry index exact
    #[test]
    fn prop_structure_stays_consistent(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let shard = single_shard(8);

        for op in ops {
            match op {
                CacheOp::Set { key, value, ttl } => shard.set(key, value, ttl),
                CacheOp::Get { key } => { let _ = shard.get(&key); }
                CacheOp::GetOrSet { key, value, ttl } => { shard.get_or_set(&key, value, ttl); }
                CacheOp::Delete { key } => { let _ = shard.delete(&key); }
            }
            if let Err(problem) = shard.check() {
                prop_assert!(false, "invariant broken: {}", problem);
            }
        }
    }

    // Stats: hits and misses match what get observed
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let shard = single_shard(100);
        let mut expected_hits = 0u64;
        let mut expected_misses = 0u64;

        for op in ops {
            match op {
                CacheOp::Set { key, value, ttl } => shard.set(key, value, ttl),
                CacheOp::Get { key } => match shard.get(&key) {
                    Ok(_) => expected_hits += 1,
                    Err(_) => expected_misses += 1,
                },
                CacheOp::GetOrSet { key, value, ttl } => {
                    if shard.exists(&key) { expected_hits += 1 } else { expected_misses += 1 }
                    shard.get_or_set(&key, value, ttl);
                }
                CacheOp::Delete { key } => { let _ = shard.delete(&key); }
            }
        }

        let stats = shard.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, shard.count());
    }
}

// Fewer cases: every case builds a store with its own reaper runtime
proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    // Routing: every key lands in exactly one shard and the store agrees
    // with a model map
    #[test]
    fn prop_store_matches_model(
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..64)
    ) {
        let store = CacheStore::<u64>::new(Config {
            shards: 8,
            capacity: 64,
            ..Config::default()
        }).unwrap();

        let mut model = std::collections::HashMap::new();
        for (key, value) in entries {
            prop_assert!(store.route(&key) < store.shard_count());
            store.set(key.clone(), value, Duration::ZERO);
            model.insert(key, value);
        }

        prop_assert_eq!(store.count(), model.len());
        for (key, value) in &model {
            prop_assert_eq!(store.get(key).unwrap(), *value);
        }
        prop_assert!(store.check().is_ok());
    }
}
