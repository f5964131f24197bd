//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single cached value and its expiry metadata.
///
/// Entries are never edited in place: an update builds a new entry and swaps
/// it into the slot held by the old one.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The key this entry is stored under
    pub key: String,
    /// The stored value
    pub value: V,
    /// Time to live, `Duration::ZERO` = no expiration
    pub ttl: Duration,
    /// Creation time (monotonic clock)
    pub created_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    pub fn new(key: String, value: V, ttl: Duration) -> Self {
        Self {
            key,
            value,
            ttl,
            created_at: Instant::now(),
        }
    }

    /// Returns true if this entry carries a TTL.
    pub fn expires(&self) -> bool {
        !self.ttl.is_zero()
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once the elapsed time is greater
    /// than or equal to its TTL. Entries without a TTL never expire.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires() && now.saturating_duration_since(self.created_at) >= self.ttl
    }

    // == Time To Live ==
    /// Returns the remaining time to live at `now`.
    ///
    /// # Returns
    /// - `None` if the entry has no TTL (never expires)
    /// - `Some(Duration::ZERO)` if the TTL has elapsed
    /// - `Some(remaining)` otherwise
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        if !self.expires() {
            return None;
        }
        let elapsed = now.saturating_duration_since(self.created_at);
        Some(self.ttl.saturating_sub(elapsed))
    }
}
