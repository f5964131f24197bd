//! Shard routing hash.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Maps a key to the 64-bit hash used to pick its shard.
///
/// Any `Fn(&str) -> u64` closure can be used as a hasher.
pub trait KeyHasher: Send + Sync {
    fn hash_key(&self, key: &str) -> u64;
}

/// Default hasher: rustc's Fx hash. Fast, not collision resistant.
#[derive(Debug, Default, Clone, Copy)]
pub struct FxKeyHasher;

impl KeyHasher for FxKeyHasher {
    fn hash_key(&self, key: &str) -> u64 {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        hasher.finish()
    }
}

impl<F> KeyHasher for F
where
    F: Fn(&str) -> u64 + Send + Sync,
{
    fn hash_key(&self, key: &str) -> u64 {
        self(key)
    }
}
