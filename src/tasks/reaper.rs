//! Expiration Reaper Task
//!
//! Background task that removes expired entries from one shard.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::cache::Shard;

/// Spawns the expiration reaper for `shard` onto `runtime`.
///
/// The task waits for whichever comes first:
/// - the shard's next sweep deadline
/// - a wake signal, sent when an entry's TTL ends before that deadline
/// - the shutdown signal
///
/// Each sweep takes the shard's write lock and reschedules the deadline to
/// the soonest remaining TTL. On shutdown the shard is flushed and the task
/// ends.
///
/// # Arguments
/// * `runtime` - Runtime the task runs on
/// * `shard` - Shard to sweep
/// * `wake_rx` - Receiving end of the shard's wake channel
/// * `shutdown_rx` - Flips to `true` when the store closes
///
/// # Example
/// ```ignore
/// let (shard, wake_rx) = Shard::new(0, 100, noop_callback(), false);
/// let shard = Arc::new(shard);
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = spawn_reaper(runtime.handle(), shard.clone(), wake_rx, shutdown_rx);
/// // Later:
/// shutdown_tx.send_replace(true);
/// ```
pub fn spawn_reaper<V>(
    runtime: &Handle,
    shard: Arc<Shard<V>>,
    mut wake_rx: mpsc::Receiver<()>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    runtime.spawn(async move {
        debug!(shard = shard.id(), "expiration reaper started");
        let mut deadline = shard.next_sweep();

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    // A dropped sender means the store is gone
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
                _ = sleep_until(Instant::from_std(deadline)) => {}
                signal = wake_rx.recv() => {
                    if signal.is_none() {
                        break;
                    }
                }
            }

            deadline = shard.sweep_expired().next_sweep;
        }

        shard.flush();
        debug!(shard = shard.id(), "expiration reaper stopped");
    })
}
