//! Shard Engine Module
//!
//! One partition of the keyspace. Combines HashMap lookup, an LRU recency
//! list, and a TTL expiry index behind a single read/write lock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::{
    CacheEntry, CacheStats, LruList, RemoveCallback, RemoveReason, Slot, DEFAULT_SWEEP_INTERVAL,
};
use crate::error::{CacheError, Result};

// == Shard State ==
/// Everything the shard lock guards.
///
/// Invariants:
/// - `items.len() == list.len() <= capacity`
/// - a key is in `expiring` iff it is in `items` and its entry has a TTL
#[derive(Debug)]
struct ShardState<V> {
    /// Key -> slot in the recency list
    items: HashMap<String, Slot>,
    /// Subset of `items` whose entries carry a TTL
    expiring: HashMap<String, Slot>,
    /// Recency order, front = most recently used
    list: LruList<CacheEntry<V>>,
    capacity: usize,
    /// When the reaper will next sweep unless woken earlier
    next_sweep: Instant,
    stats: CacheStats,
}

impl<V> ShardState<V> {
    fn new(capacity: usize) -> Self {
        Self {
            items: HashMap::with_capacity(capacity),
            expiring: HashMap::new(),
            list: LruList::with_capacity(capacity),
            capacity,
            next_sweep: Instant::now() + DEFAULT_SWEEP_INTERVAL,
            stats: CacheStats::new(),
        }
    }

    fn entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.items.get(key).and_then(|&slot| self.list.get(slot))
    }

    /// Unlinks `key` from all three structures.
    fn detach(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let slot = self.items.remove(key)?;
        self.expiring.remove(key);
        self.list.remove(slot)
    }

    fn flush(&mut self) {
        self.items = HashMap::new();
        self.expiring = HashMap::new();
        self.list.clear();
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.items.len() != self.list.len() {
            return Err(format!(
                "items holds {} keys but the recency list holds {} entries",
                self.items.len(),
                self.list.len()
            ));
        }
        if self.items.len() > self.capacity {
            return Err(format!(
                "{} entries exceed capacity {}",
                self.items.len(),
                self.capacity
            ));
        }
        for (key, &slot) in &self.items {
            let entry = match self.list.get(slot) {
                Some(entry) if entry.key == *key => entry,
                Some(entry) => {
                    return Err(format!("key {key} points at the entry for {}", entry.key))
                }
                None => return Err(format!("key {key} points at an empty slot")),
            };
            match self.expiring.get(key) {
                Some(&indexed) if indexed != slot => {
                    return Err(format!("expiry index slot for {key} is stale"))
                }
                Some(_) if !entry.expires() => {
                    return Err(format!("persistent key {key} is in the expiry index"))
                }
                None if entry.expires() => {
                    return Err(format!("expiring key {key} is missing from the expiry index"))
                }
                _ => {}
            }
        }
        if let Some(orphan) = self.expiring.keys().find(|k| !self.items.contains_key(*k)) {
            return Err(format!("expiry index holds unknown key {orphan}"));
        }
        Ok(())
    }
}

// == Sweep Outcome ==
/// Result of one expiry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Entries removed as expired
    pub removed: usize,
    /// When the next sweep is due
    pub next_sweep: Instant,
}

// == Shard ==
/// A single cache shard.
///
/// Every operation takes the shard lock; reads that promote an entry in the
/// LRU order take it exclusively. The removal callback runs while the lock is
/// held, so it observes the shard in a consistent state and delays every other
/// caller of this shard until it returns.
pub struct Shard<V> {
    id: usize,
    state: RwLock<ShardState<V>>,
    on_remove: RemoveCallback<V>,
    /// Asks the reaper for an immediate sweep
    wake_tx: mpsc::Sender<()>,
    verbose: bool,
}

impl<V: Clone> Shard<V> {
    // == Constructor ==
    /// Creates an empty shard and the receiving end of its wake channel.
    pub fn new(
        id: usize,
        capacity: usize,
        on_remove: RemoveCallback<V>,
        verbose: bool,
    ) -> (Self, mpsc::Receiver<()>) {
        // A single slot is enough: one pending wake covers any number of inserts
        let (wake_tx, wake_rx) = mpsc::channel(1);
        let shard = Self {
            id,
            state: RwLock::new(ShardState::new(capacity)),
            on_remove,
            wake_tx,
            verbose,
        };
        (shard, wake_rx)
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.state.read().capacity
    }

    // == Set ==
    /// Stores a value, replacing any existing entry for the key.
    ///
    /// A new key in a full shard evicts the least recently used entry first.
    pub fn set(&self, key: String, value: V, ttl: Duration) {
        let mut guard = self.state.write();
        self.store(&mut guard, key, value, ttl, Instant::now());
    }

    // == Get ==
    /// Retrieves a value and marks it most recently used.
    ///
    /// An entry whose TTL has elapsed is removed on the spot and reported as
    /// missing, even if the reaper has not swept it yet.
    pub fn get(&self, key: &str) -> Result<V> {
        let mut guard = self.state.write();
        self.lookup(&mut guard, key, Instant::now())
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))
    }

    // == Get Or Set ==
    /// Returns the live value for `key`, or stores and returns `value`.
    ///
    /// On a hit the arguments are ignored; the stored entry is untouched
    /// apart from being promoted.
    pub fn get_or_set(&self, key: &str, value: V, ttl: Duration) -> V {
        let mut guard = self.state.write();
        let now = Instant::now();
        if let Some(existing) = self.lookup(&mut guard, key, now) {
            return existing;
        }
        self.store(&mut guard, key.to_string(), value.clone(), ttl, now);
        value
    }

    // == Get If Absent Compute ==
    /// Like [`Shard::get_or_set`], but a miss is filled by `compute`.
    ///
    /// `compute` runs with the shard lock held, so at most one computation per
    /// shard is in flight and other keys on this shard wait for it. If it
    /// fails nothing is stored.
    pub fn get_if_absent_compute<F, E>(&self, key: &str, ttl: Duration, compute: F) -> Result<V>
    where
        F: FnOnce(&str) -> std::result::Result<V, E>,
        E: Into<anyhow::Error>,
    {
        let mut guard = self.state.write();
        let now = Instant::now();
        if let Some(existing) = self.lookup(&mut guard, key, now) {
            return Ok(existing);
        }

        let value = compute(key).map_err(|err| CacheError::ComputeFailed {
            key: key.to_string(),
            source: err.into(),
        })?;
        self.store(&mut guard, key.to_string(), value.clone(), ttl, now);
        Ok(value)
    }

    // == Delete ==
    /// Removes an entry by key.
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut guard = self.state.write();
        let now = Instant::now();
        let expired = match guard.entry(key) {
            Some(entry) => entry.is_expired_at(now),
            None => return Err(CacheError::KeyNotFound(key.to_string())),
        };

        if expired {
            self.remove(&mut guard, key, RemoveReason::Expired);
            return Err(CacheError::KeyNotFound(key.to_string()));
        }
        self.remove(&mut guard, key, RemoveReason::Deleted);
        Ok(())
    }

    // == Count ==
    /// Number of entries held, including expired ones not yet swept.
    pub fn count(&self) -> usize {
        self.state.read().items.len()
    }

    /// Returns true if `key` holds an unexpired entry. Does not promote.
    pub fn exists(&self, key: &str) -> bool {
        let now = Instant::now();
        self.state
            .read()
            .entry(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == For Each ==
    /// Visits every unexpired entry once, in no particular order.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &V),
    {
        let now = Instant::now();
        let state = self.state.read();
        for entry in state.list.iter().filter(|e| !e.is_expired_at(now)) {
            visitor(&entry.key, &entry.value);
        }
    }

    // == Stats ==
    /// Returns a snapshot of this shard's counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.read();
        let mut stats = state.stats.clone();
        stats.total_entries = state.items.len();
        stats
    }

    /// Verifies the structural invariants of the shard.
    pub fn check(&self) -> std::result::Result<(), String> {
        self.state.read().check()
    }

    /// Deadline the reaper is currently waiting for.
    pub fn next_sweep(&self) -> Instant {
        self.state.read().next_sweep
    }

    // == Sweep Expired ==
    /// Removes every expired entry and reschedules the next sweep.
    ///
    /// The next sweep is due when the soonest surviving TTL runs out, but never
    /// later than [`DEFAULT_SWEEP_INTERVAL`] from now.
    pub fn sweep_expired(&self) -> SweepOutcome {
        let mut guard = self.state.write();
        let now = Instant::now();

        let mut expired = Vec::new();
        let mut soonest: Option<Duration> = None;
        for (key, &slot) in &guard.expiring {
            let Some(entry) = guard.list.get(slot) else {
                warn!(shard = self.id, key = %key, "expiry index points at an empty slot");
                continue;
            };
            if !entry.expires() {
                warn!(shard = self.id, key = %key, "entry without ttl found in expiry index");
                continue;
            }
            if entry.is_expired_at(now) {
                expired.push(key.clone());
            } else if let Some(remaining) = entry.remaining_at(now) {
                soonest = Some(soonest.map_or(remaining, |s| s.min(remaining)));
            }
        }

        for key in &expired {
            self.remove(&mut guard, key, RemoveReason::Expired);
        }

        // Capped so a huge TTL never produces an unrepresentable deadline
        let interval = soonest.map_or(DEFAULT_SWEEP_INTERVAL, |s| s.min(DEFAULT_SWEEP_INTERVAL));
        guard.next_sweep = now + interval;
        debug!(
            shard = self.id,
            removed = expired.len(),
            next_sweep_ms = interval.as_millis() as u64,
            "expiry sweep finished"
        );

        SweepOutcome {
            removed: expired.len(),
            next_sweep: guard.next_sweep,
        }
    }

    // == Flush ==
    /// Drops every entry without firing callbacks. Safe to call repeatedly.
    pub fn flush(&self) {
        self.state.write().flush();
        if self.verbose {
            debug!(shard = self.id, "shard flushed");
        }
    }

    /// Returns the live value for `key`, promoting it; reaps it if expired.
    fn lookup(&self, state: &mut ShardState<V>, key: &str, now: Instant) -> Option<V> {
        let Some(&slot) = state.items.get(key) else {
            state.stats.record_miss();
            return None;
        };

        let live = state.list.get(slot).is_some_and(|e| !e.is_expired_at(now));
        if !live {
            self.remove(state, key, RemoveReason::Expired);
            state.stats.record_miss();
            return None;
        }

        state.list.move_to_front(slot);
        state.stats.record_hit();
        state.list.get(slot).map(|entry| entry.value.clone())
    }

    fn store(&self, state: &mut ShardState<V>, key: String, value: V, ttl: Duration, now: Instant) {
        let expires = !ttl.is_zero();

        if let Some(&slot) = state.items.get(&key) {
            let previous = state
                .list
                .replace(slot, CacheEntry::new(key.clone(), value, ttl));
            state.list.move_to_front(slot);

            let had_ttl = previous.is_some_and(|p| p.expires());
            if had_ttl && !expires {
                state.expiring.remove(&key);
            } else if !had_ttl && expires {
                state.expiring.insert(key.clone(), slot);
            }
        } else {
            if state.items.len() >= state.capacity {
                let victim = state.list.back().map(|entry| entry.key.clone());
                if let Some(victim) = victim {
                    self.remove(state, &victim, RemoveReason::NoSpace);
                }
            }

            let slot = state
                .list
                .push_front(CacheEntry::new(key.clone(), value, ttl));
            if expires {
                state.expiring.insert(key.clone(), slot);
            }
            state.items.insert(key.clone(), slot);
        }

        if self.verbose {
            debug!(shard = self.id, key = %key, ttl_ms = ttl.as_millis() as u64, "set entry");
        }

        // Don't let a short-lived entry wait out a longer sleep
        let due_early = now
            .checked_add(ttl)
            .is_some_and(|due| due < state.next_sweep);
        if expires && due_early {
            self.wake();
        }
    }

    fn remove(&self, state: &mut ShardState<V>, key: &str, reason: RemoveReason) {
        let Some(entry) = state.detach(key) else {
            return;
        };
        match reason {
            RemoveReason::Expired => state.stats.record_expiration(),
            RemoveReason::NoSpace => state.stats.record_eviction(),
            RemoveReason::Deleted => state.stats.record_deletion(),
        }
        if self.verbose {
            debug!(shard = self.id, key = %entry.key, %reason, "removed entry");
        }
        (self.on_remove)(&entry.key, &entry.value, reason);
    }

    fn wake(&self) {
        // Full means a wake is already pending; closed means the reaper is gone
        let _ = self.wake_tx.try_send(());
    }
}
