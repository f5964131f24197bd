//! Removal notifications.

use std::fmt;
use std::sync::Arc;

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoveReason {
    /// The entry outlived its TTL.
    Expired,
    /// The entry was the least recently used one in a full shard.
    NoSpace,
    /// The entry was removed by an explicit delete.
    Deleted,
}

impl fmt::Display for RemoveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoveReason::Expired => "expired",
            RemoveReason::NoSpace => "no_space",
            RemoveReason::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// Callback fired for every eviction, expiration, and delete.
///
/// It runs synchronously while the owning shard's lock is held: a slow
/// callback stalls that shard, and calling back into the same shard from
/// inside it deadlocks. Panics are not caught.
pub type RemoveCallback<V> = Arc<dyn Fn(&str, &V, RemoveReason) + Send + Sync>;

/// Callback used when none is configured.
pub fn noop_callback<V: 'static>() -> RemoveCallback<V> {
    Arc::new(|_: &str, _: &V, _: RemoveReason| {})
}
