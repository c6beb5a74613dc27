//! Block manager - decides how streamed block changes reach the store
//!
//! One manager per message stream. It tracks the block currently receiving
//! updates, keeps an in-process cache of the latest merged snapshots, and
//! routes each change either through the deferred-write scheduler (same
//! block type, mid-stream) or straight to the store (type transition or
//! completion). The caller must invoke its methods strictly sequentially
//! for one stream; `&mut self` makes a second concurrent writer a compile
//! error rather than silent corruption.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::scheduler::WriteScheduler;
use crate::storage::helper::unix_timestamp;
use crate::storage::ids::{BlockId, MessageId, TopicId};
use crate::storage::traits::{BlockStore, MessageStore};
use crate::storage::types::{Block, BlockPatch, BlockType};

/// The block currently receiving streamed updates, if any
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveBlockInfo {
    /// Block receiving updates
    pub id: BlockId,
    /// Its content kind
    pub kind: BlockType,
}

/// Hook invoked after every immediate block persistence
///
/// Intended for downstream notification/sync (UI state, cross-device sync);
/// its durability is the implementer's responsibility.
#[async_trait]
pub trait StreamHooks: Send + Sync {
    async fn save_updated_block(
        &self,
        block_id: Option<&BlockId>,
        message_id: &MessageId,
        topic_id: &TopicId,
        snapshot: Option<&Block>,
    ) -> Result<()>;
}

/// No-op hooks for callers without a downstream consumer
pub struct NoopStreamHooks;

#[async_trait]
impl StreamHooks for NoopStreamHooks {
    async fn save_updated_block(
        &self,
        _block_id: Option<&BlockId>,
        _message_id: &MessageId,
        _topic_id: &TopicId,
        _snapshot: Option<&Block>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Per-stream block persistence manager
pub struct BlockManager {
    blocks: Arc<dyn BlockStore>,
    messages: Arc<dyn MessageStore>,
    scheduler: Arc<dyn WriteScheduler>,
    hooks: Arc<dyn StreamHooks>,
    message_id: MessageId,
    topic_id: TopicId,

    active_block_info: Option<ActiveBlockInfo>,
    last_block_type: Option<BlockType>,
    cache: HashMap<BlockId, Block>,
}

impl BlockManager {
    pub fn new(
        blocks: Arc<dyn BlockStore>,
        messages: Arc<dyn MessageStore>,
        scheduler: Arc<dyn WriteScheduler>,
        hooks: Arc<dyn StreamHooks>,
        message_id: MessageId,
        topic_id: TopicId,
    ) -> Self {
        Self {
            blocks,
            messages,
            scheduler,
            hooks,
            message_id,
            topic_id,
            active_block_info: None,
            last_block_type: None,
            cache: HashMap::new(),
        }
    }

    // Accessors

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    pub fn active_block_info(&self) -> Option<&ActiveBlockInfo> {
        self.active_block_info.as_ref()
    }

    pub fn last_block_type(&self) -> Option<BlockType> {
        self.last_block_type
    }

    /// True iff the active block is an `Unknown` placeholder
    pub fn has_initial_placeholder(&self) -> bool {
        self.active_block_info
            .as_ref()
            .is_some_and(|info| info.kind == BlockType::Unknown)
    }

    /// The placeholder block's ID, when one is active
    pub fn initial_placeholder_block_id(&self) -> Option<&BlockId> {
        self.active_block_info
            .as_ref()
            .filter(|info| info.kind == BlockType::Unknown)
            .map(|info| &info.id)
    }

    /// Latest merged snapshot for a block, if cached
    pub fn cached_block(&self, block_id: &BlockId) -> Option<&Block> {
        self.cache.get(block_id)
    }

    /// Merge a change set into the cached (or store-loaded) snapshot
    ///
    /// Returns `None` when no prior snapshot exists anywhere; the caller
    /// proceeds with the raw change set. Store errors propagate.
    async fn merge_block_changes(
        &mut self,
        block_id: &BlockId,
        changes: &BlockPatch,
    ) -> Result<Option<Block>> {
        let existing = match self.cache.get(block_id) {
            Some(cached) => Some(cached.clone()),
            None => self.blocks.get_block_by_id(block_id).await?,
        };

        let Some(existing) = existing else {
            tracing::warn!("Block {} not found when applying changes", block_id);
            return Ok(None);
        };

        let merged = existing.with_changes(changes);
        self.cache.insert(block_id.clone(), merged.clone());
        Ok(Some(merged))
    }

    /// Route a streamed change to the deferred or immediate write path
    ///
    /// Consecutive same-type chunks are the hot path and go through the
    /// rate-limited scheduler. A block-type transition or an explicit
    /// completion is a correctness boundary: any pending deferred write
    /// that could outlive it is cancelled and the change is written
    /// through synchronously, so readers never observe a stale block once
    /// a new one has logically begun.
    pub async fn smart_block_update(
        &mut self,
        block_id: &BlockId,
        changes: BlockPatch,
        kind: BlockType,
        is_complete: bool,
    ) -> Result<()> {
        let type_changed = self
            .last_block_type
            .is_some_and(|last| last != kind);

        let mut changes = changes;
        if changes.updated_at.is_none() {
            changes.updated_at = Some(unix_timestamp());
        }

        let snapshot = self.merge_block_changes(block_id, &changes).await?;

        if type_changed || is_complete {
            if type_changed {
                if let Some(active) = &self.active_block_info {
                    self.scheduler.cancel_deferred_update(&active.id).await?;
                }
            }

            if is_complete {
                self.scheduler.cancel_deferred_update(block_id).await?;
                self.active_block_info = None;
            } else {
                self.active_block_info = Some(ActiveBlockInfo {
                    id: block_id.clone(),
                    kind,
                });
            }

            self.blocks.update_one_block(block_id, &changes).await?;
            self.hooks
                .save_updated_block(
                    Some(block_id),
                    &self.message_id,
                    &self.topic_id,
                    snapshot.as_ref(),
                )
                .await?;
            self.last_block_type = Some(kind);
        } else {
            self.active_block_info = Some(ActiveBlockInfo {
                id: block_id.clone(),
                kind,
            });
            self.scheduler
                .schedule_deferred_update(block_id, changes)
                .await?;
        }

        Ok(())
    }

    /// Register a newly created block as the active block
    ///
    /// Seeds the cache, persists the block immediately, then recomputes the
    /// owning message's status from the block's. A missing message is
    /// logged and skipped; the block write is not rolled back.
    pub async fn handle_block_transition(&mut self, block: Block, kind: BlockType) -> Result<()> {
        tracing::debug!("Block transition to {} ({})", kind, block.id);
        self.last_block_type = Some(kind);
        self.active_block_info = Some(ActiveBlockInfo {
            id: block.id.clone(),
            kind,
        });
        self.cache.insert(block.id.clone(), block.clone());

        self.blocks
            .upsert_blocks(std::slice::from_ref(&block))
            .await?;

        let Some(mut message) = self.messages.get_message_by_id(&block.message_id).await? else {
            tracing::error!("Message {} not found during block transition", block.message_id);
            return Ok(());
        };

        if let Some(next) = message.status.advanced_by(block.status) {
            message.status = next;
            message.updated_at = unix_timestamp();
        }

        if self.messages.upsert_message(&message).await?.is_none() {
            tracing::error!("Failed to update message {}", message.id);
        }

        Ok(())
    }
}
