//! Deferred, rate-limited block writes
//!
//! Consecutive same-type stream chunks arrive many times a second; writing
//! each one through would hammer the store for content the next chunk
//! replaces anyway. The scheduler batches those writes per block: changes
//! accumulate in a pending patch and a single flush fires after the
//! throttle interval. Cancelling discards whatever has not flushed yet.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::storage::ids::BlockId;
use crate::storage::traits::BlockStore;
use crate::storage::types::BlockPatch;

/// Trait for rate-limited deferred block persistence
#[async_trait]
pub trait WriteScheduler: Send + Sync {
    /// Queue a partial update for a rate-limited flush
    ///
    /// Changes queued for the same block within one flush window are
    /// coalesced, later fields winning.
    async fn schedule_deferred_update(&self, block_id: &BlockId, changes: BlockPatch)
        -> Result<()>;

    /// Discard any not-yet-flushed pending write for a block
    ///
    /// Idempotent: cancelling a block with nothing pending is a no-op.
    /// Never rolls back an already-applied write.
    async fn cancel_deferred_update(&self, block_id: &BlockId) -> Result<()>;
}

struct PendingWrite {
    changes: BlockPatch,
    flush_task: JoinHandle<()>,
}

type PendingMap = HashMap<String, PendingWrite>;

/// Trailing-edge throttle over a `BlockStore`
///
/// The first schedule for a block arms a flush task; schedules landing
/// before it fires overlay onto the pending patch without re-arming the
/// timer, so a block is written at most once per interval.
pub struct ThrottledWriteScheduler {
    store: Arc<dyn BlockStore>,
    interval: Duration,
    pending: Arc<Mutex<PendingMap>>,
}

impl ThrottledWriteScheduler {
    pub fn new(store: Arc<dyn BlockStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn spawn_flush(&self, block_id: BlockId) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let pending = Arc::clone(&self.pending);
        let interval = self.interval;

        tokio::spawn(async move {
            tokio::time::sleep(interval).await;

            let write = pending.lock().unwrap().remove(block_id.as_str());
            let Some(write) = write else {
                return; // cancelled while sleeping
            };

            if let Err(e) = store.update_one_block(&block_id, &write.changes).await {
                tracing::error!("Deferred flush for block {} failed: {}", block_id, e);
            }
        })
    }
}

#[async_trait]
impl WriteScheduler for ThrottledWriteScheduler {
    async fn schedule_deferred_update(
        &self,
        block_id: &BlockId,
        changes: BlockPatch,
    ) -> Result<()> {
        let mut pending = self.pending.lock().unwrap();
        if let Some(write) = pending.get_mut(block_id.as_str()) {
            write.changes.overlay(changes);
        } else {
            // Arm the flush while still holding the lock; the task blocks on
            // it until we are done inserting.
            let flush_task = self.spawn_flush(block_id.clone());
            pending.insert(
                block_id.as_str().to_string(),
                PendingWrite {
                    changes,
                    flush_task,
                },
            );
        }
        Ok(())
    }

    async fn cancel_deferred_update(&self, block_id: &BlockId) -> Result<()> {
        let write = self.pending.lock().unwrap().remove(block_id.as_str());
        if let Some(write) = write {
            write.flush_task.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ids::MessageId;
    use crate::storage::implementations::MemoryStore;
    use crate::storage::types::{Block, BlockStatus};

    const INTERVAL: Duration = Duration::from_millis(100);

    async fn seed_block(store: &MemoryStore) -> Block {
        let block = Block::main_text(MessageId::new(), "", BlockStatus::Streaming);
        store.upsert_blocks(std::slice::from_ref(&block)).await.unwrap();
        block
    }

    fn content_patch(text: &str) -> BlockPatch {
        BlockPatch {
            content: Some(text.to_string()),
            ..BlockPatch::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_applies_after_interval() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = ThrottledWriteScheduler::new(store.clone(), INTERVAL);
        let block = seed_block(&store).await;

        scheduler
            .schedule_deferred_update(&block.id, content_patch("hello"))
            .await
            .unwrap();

        tokio::time::sleep(INTERVAL * 2).await;

        let loaded = store.get_block_by_id(&block.id).await.unwrap().unwrap();
        assert_eq!(loaded.content, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_coalesce_within_window() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = ThrottledWriteScheduler::new(store.clone(), INTERVAL);
        let block = seed_block(&store).await;

        scheduler
            .schedule_deferred_update(&block.id, content_patch("hel"))
            .await
            .unwrap();
        scheduler
            .schedule_deferred_update(&block.id, content_patch("hello"))
            .await
            .unwrap();

        tokio::time::sleep(INTERVAL * 2).await;

        let loaded = store.get_block_by_id(&block.id).await.unwrap().unwrap();
        assert_eq!(loaded.content, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending_write() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = ThrottledWriteScheduler::new(store.clone(), INTERVAL);
        let block = seed_block(&store).await;

        scheduler
            .schedule_deferred_update(&block.id, content_patch("doomed"))
            .await
            .unwrap();
        scheduler.cancel_deferred_update(&block.id).await.unwrap();

        tokio::time::sleep(INTERVAL * 2).await;

        let loaded = store.get_block_by_id(&block.id).await.unwrap().unwrap();
        assert_eq!(loaded.content, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_without_pending_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = ThrottledWriteScheduler::new(store, INTERVAL);
        let block_id = BlockId::new();

        scheduler.cancel_deferred_update(&block_id).await.unwrap();
        scheduler.cancel_deferred_update(&block_id).await.unwrap();
    }
}
