//! Background Tasks Module
//!
//! Contains the background tasks that run for the lifetime of a cache store.
//!
//! # Tasks
//! - Expiration reaper: one per shard, removes expired entries on an
//!   adaptive schedule

mod reaper;

pub use reaper::spawn_reaper;
