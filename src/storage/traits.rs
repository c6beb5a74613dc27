//! Storage traits for blocks and messages
//!
//! The block store is the durable system of record; the in-process block
//! cache held by the block manager is a best-effort mirror on top of it.
//! Implementations must tolerate point reads concurrent with the stream's
//! writes (other parts of the application read the store directly).

use anyhow::Result;
use async_trait::async_trait;

use crate::storage::ids::{BlockId, MessageId};
use crate::storage::types::{Block, BlockPatch, Message};

/// Trait for durable block persistence
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Point read of a block
    async fn get_block_by_id(&self, id: &BlockId) -> Result<Option<Block>>;

    /// Insert or fully replace blocks
    async fn upsert_blocks(&self, blocks: &[Block]) -> Result<()>;

    /// Apply a partial change set to one block
    ///
    /// A missing row is left untouched; the caller already logs the miss.
    async fn update_one_block(&self, id: &BlockId, changes: &BlockPatch) -> Result<()>;
}

/// Trait for durable message persistence
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Point read of a message
    async fn get_message_by_id(&self, id: &MessageId) -> Result<Option<Message>>;

    /// Insert or fully replace a message, returning the stored row
    ///
    /// Returns `None` when the row could not be stored.
    async fn upsert_message(&self, message: &Message) -> Result<Option<Message>>;
}
