//! Reasoning-stream callbacks
//!
//! Same start/chunk/complete shape as the text kind, for `Thinking`
//! blocks. Additionally tracks elapsed reasoning time, stamped into every
//! chunk so the UI can show a live duration while the model thinks.

use anyhow::Result;
use std::time::Instant;

use crate::storage::ids::{BlockId, MessageId};
use crate::storage::types::{Block, BlockPatch, BlockStatus, BlockType};
use crate::streaming::block_manager::BlockManager;

/// Per-stream thinking callback state
pub struct ThinkingCallbacks {
    message_id: MessageId,
    thinking_block_id: Option<BlockId>,
    started: Option<Instant>,
}

impl ThinkingCallbacks {
    pub fn new(message_id: MessageId) -> Self {
        Self {
            message_id,
            thinking_block_id: None,
            started: None,
        }
    }

    /// The running thinking block, if a segment is in flight
    pub fn thinking_block_id(&self) -> Option<&BlockId> {
        self.thinking_block_id.as_ref()
    }

    fn elapsed_ms(&self) -> Option<i64> {
        self.started.map(|started| started.elapsed().as_millis() as i64)
    }

    /// A reasoning segment is starting
    pub async fn on_thinking_start(&mut self, manager: &mut BlockManager) -> Result<()> {
        self.started = Some(Instant::now());

        if let Some(block_id) = manager.initial_placeholder_block_id().cloned() {
            let changes = BlockPatch {
                kind: Some(BlockType::Thinking),
                content: Some(String::new()),
                status: Some(BlockStatus::Streaming),
                ..BlockPatch::default()
            };
            self.thinking_block_id = Some(block_id.clone());
            manager
                .smart_block_update(&block_id, changes, BlockType::Thinking, true)
                .await?;
        } else if self.thinking_block_id.is_none() {
            let block = Block::thinking(self.message_id.clone(), BlockStatus::Streaming);
            self.thinking_block_id = Some(block.id.clone());
            manager
                .handle_block_transition(block, BlockType::Thinking)
                .await?;
        }
        Ok(())
    }

    /// A cumulative reasoning chunk arrived
    pub async fn on_thinking_chunk(
        &mut self,
        manager: &mut BlockManager,
        text: &str,
    ) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        let Some(block_id) = self.thinking_block_id.clone() else {
            tracing::warn!("Received thinking chunk with no running thinking block");
            return Ok(());
        };

        let changes = BlockPatch {
            content: Some(text.to_string()),
            status: Some(BlockStatus::Streaming),
            thinking_ms: self.elapsed_ms(),
            ..BlockPatch::default()
        };
        manager
            .smart_block_update(&block_id, changes, BlockType::Thinking, false)
            .await
    }

    /// The reasoning segment completed with its final cumulative text
    pub async fn on_thinking_complete(
        &mut self,
        manager: &mut BlockManager,
        final_text: &str,
    ) -> Result<()> {
        match self.thinking_block_id.take() {
            Some(block_id) => {
                let changes = BlockPatch {
                    content: Some(final_text.to_string()),
                    status: Some(BlockStatus::Success),
                    thinking_ms: self.elapsed_ms(),
                    ..BlockPatch::default()
                };
                self.started = None;
                manager
                    .smart_block_update(&block_id, changes, BlockType::Thinking, true)
                    .await
            }
            None => {
                tracing::warn!(
                    "Received thinking.complete but no thinking block is running (last block type {:?})",
                    manager.last_block_type()
                );
                Ok(())
            }
        }
    }
}
