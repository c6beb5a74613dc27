//! Per-stream handle wiring the block manager and callback sets together
//!
//! One `MessageStream` per in-flight assistant message. It owns all the
//! mutable stream-scoped state, so lifecycle events for one stream can only
//! be delivered through one `&mut` handle - the sequential-call requirement
//! is enforced by the borrow checker instead of documentation alone.

use anyhow::Result;
use std::sync::Arc;

use crate::scheduler::WriteScheduler;
use crate::storage::ids::{BlockId, MessageId, TopicId};
use crate::storage::traits::{BlockStore, MessageStore};
use crate::storage::types::{Block, BlockType};
use crate::streaming::block_manager::{BlockManager, StreamHooks};
use crate::streaming::callbacks::{TextCallbacks, ThinkingCallbacks};

/// Assembles one message's blocks from generation-backend stream events
pub struct MessageStream {
    manager: BlockManager,
    text: TextCallbacks,
    thinking: ThinkingCallbacks,
    citation_block_id: Option<BlockId>,
}

impl MessageStream {
    pub fn new(
        blocks: Arc<dyn BlockStore>,
        messages: Arc<dyn MessageStore>,
        scheduler: Arc<dyn WriteScheduler>,
        hooks: Arc<dyn StreamHooks>,
        message_id: MessageId,
        topic_id: TopicId,
    ) -> Self {
        let manager = BlockManager::new(
            Arc::clone(&blocks),
            messages,
            scheduler,
            hooks,
            message_id.clone(),
            topic_id,
        );
        Self {
            manager,
            text: TextCallbacks::new(blocks, message_id.clone()),
            thinking: ThinkingCallbacks::new(message_id),
            citation_block_id: None,
        }
    }

    /// Read access to the underlying block manager state
    pub fn manager(&self) -> &BlockManager {
        &self.manager
    }

    /// Create an `Unknown` placeholder block before the first content kind
    /// is known; the first segment to stream reclassifies it in place
    pub async fn start_placeholder(&mut self) -> Result<BlockId> {
        let block = Block::placeholder(self.manager.message_id().clone());
        let block_id = block.id.clone();
        self.manager
            .handle_block_transition(block, BlockType::Unknown)
            .await?;
        Ok(block_id)
    }

    /// Point subsequent text chunks at a citation block (or clear it)
    pub fn set_citation_block_id(&mut self, citation_block_id: Option<BlockId>) {
        self.citation_block_id = citation_block_id;
    }

    // Text kind

    pub async fn on_text_start(&mut self) -> Result<()> {
        self.text.on_text_start(&mut self.manager).await
    }

    pub async fn on_text_chunk(&mut self, text: &str) -> Result<()> {
        self.text
            .on_text_chunk(&mut self.manager, self.citation_block_id.as_ref(), text)
            .await
    }

    pub async fn on_text_complete(&mut self, final_text: &str) -> Result<()> {
        self.text.on_text_complete(&mut self.manager, final_text).await
    }

    // Thinking kind

    pub async fn on_thinking_start(&mut self) -> Result<()> {
        self.thinking.on_thinking_start(&mut self.manager).await
    }

    pub async fn on_thinking_chunk(&mut self, text: &str) -> Result<()> {
        self.thinking.on_thinking_chunk(&mut self.manager, text).await
    }

    pub async fn on_thinking_complete(&mut self, final_text: &str) -> Result<()> {
        self.thinking
            .on_thinking_complete(&mut self.manager, final_text)
            .await
    }
}
