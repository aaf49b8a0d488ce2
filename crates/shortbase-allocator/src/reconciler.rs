use crate::allocator::ShardAllocator;
use crate::picker::ShardPicker;
use shortbase_core::{RecordStore, ShardId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Handle to the background task that writes shard counters back to the
/// shard index.
///
/// Notifications never block the caller. Bursts of notifications for the
/// same shard are coalesced into a single write carrying the latest counter.
/// Failed writes are logged and dropped; the next notification for the shard
/// carries a newer value anyway.
#[derive(Debug, Clone)]
pub struct IndexReconciler {
    tx: UnboundedSender<ShardId>,
}

impl IndexReconciler {
    /// Spawns the reconciler task on the current Tokio runtime.
    ///
    /// The task stops once every clone of the returned handle is dropped and
    /// the pending queue is drained.
    pub fn spawn<P, S>(allocator: Arc<ShardAllocator<P>>, store: Arc<S>) -> (Self, JoinHandle<()>)
    where
        P: ShardPicker,
        S: RecordStore + ?Sized,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(allocator, store, rx));
        (Self { tx }, handle)
    }

    /// Schedules a write-back of `shard`'s counter.
    pub fn notify(&self, shard: ShardId) {
        if self.tx.send(shard).is_err() {
            warn!(shard = %shard, "index reconciler stopped; dropping update");
        }
    }
}

async fn run<P, S>(
    allocator: Arc<ShardAllocator<P>>,
    store: Arc<S>,
    mut rx: UnboundedReceiver<ShardId>,
) where
    P: ShardPicker,
    S: RecordStore + ?Sized,
{
    let mut pending = BTreeSet::new();

    while let Some(shard) = rx.recv().await {
        pending.insert(shard);
        while let Ok(shard) = rx.try_recv() {
            pending.insert(shard);
        }

        for shard in std::mem::take(&mut pending) {
            let Some(entry) = allocator.snapshot(shard) else {
                continue;
            };

            match store.save_index(entry).await {
                Ok(()) => trace!(shard = %shard, counter = entry.counter, "shard index saved"),
                Err(err) => warn!(
                    shard = %shard,
                    counter = entry.counter,
                    error = %err,
                    "failed to save shard index"
                ),
            }
        }
    }

    debug!("index reconciler stopped");
}
