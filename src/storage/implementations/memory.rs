//! In-memory block/message store
//!
//! Default backend for tests and ephemeral sessions. Keyed by ID string,
//! guarded by plain mutexes; every operation clones in or out so callers
//! never observe a half-applied row.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::storage::ids::{BlockId, MessageId};
use crate::storage::traits::{BlockStore, MessageStore};
use crate::storage::types::{Block, BlockPatch, Message};

/// In-memory store implementing both `BlockStore` and `MessageStore`
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocks: Mutex<HashMap<String, Block>>,
    messages: Mutex<HashMap<String, Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently stored
    pub fn block_count(&self) -> usize {
        self.blocks.lock().unwrap().len()
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn get_block_by_id(&self, id: &BlockId) -> Result<Option<Block>> {
        let blocks = self.blocks.lock().unwrap();
        Ok(blocks.get(id.as_str()).cloned())
    }

    async fn upsert_blocks(&self, new_blocks: &[Block]) -> Result<()> {
        let mut blocks = self.blocks.lock().unwrap();
        for block in new_blocks {
            blocks.insert(block.id.as_str().to_string(), block.clone());
        }
        Ok(())
    }

    async fn update_one_block(&self, id: &BlockId, changes: &BlockPatch) -> Result<()> {
        let mut blocks = self.blocks.lock().unwrap();
        if let Some(existing) = blocks.get(id.as_str()) {
            let merged = existing.with_changes(changes);
            blocks.insert(id.as_str().to_string(), merged);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn get_message_by_id(&self, id: &MessageId) -> Result<Option<Message>> {
        let messages = self.messages.lock().unwrap();
        Ok(messages.get(id.as_str()).cloned())
    }

    async fn upsert_message(&self, message: &Message) -> Result<Option<Message>> {
        let mut messages = self.messages.lock().unwrap();
        messages.insert(message.id.as_str().to_string(), message.clone());
        Ok(Some(message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ids::TopicId;
    use crate::storage::types::BlockStatus;

    #[tokio::test]
    async fn test_upsert_and_get_block() {
        let store = MemoryStore::new();
        let block = Block::main_text(MessageId::new(), "hi", BlockStatus::Streaming);

        store.upsert_blocks(std::slice::from_ref(&block)).await.unwrap();

        let loaded = store.get_block_by_id(&block.id).await.unwrap().unwrap();
        assert_eq!(loaded.content, "hi");
    }

    #[tokio::test]
    async fn test_update_one_block_applies_patch() {
        let store = MemoryStore::new();
        let block = Block::main_text(MessageId::new(), "hi", BlockStatus::Streaming);
        store.upsert_blocks(std::slice::from_ref(&block)).await.unwrap();

        let changes = BlockPatch {
            content: Some("hi there".to_string()),
            status: Some(BlockStatus::Success),
            ..BlockPatch::default()
        };
        store.update_one_block(&block.id, &changes).await.unwrap();

        let loaded = store.get_block_by_id(&block.id).await.unwrap().unwrap();
        assert_eq!(loaded.content, "hi there");
        assert_eq!(loaded.status, BlockStatus::Success);
        assert_eq!(loaded.id, block.id);
    }

    #[tokio::test]
    async fn test_update_missing_block_is_noop() {
        let store = MemoryStore::new();
        let id = BlockId::new();
        store.update_one_block(&id, &BlockPatch::default()).await.unwrap();
        assert!(store.get_block_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_message_returns_row() {
        let store = MemoryStore::new();
        let message = Message::new(TopicId::new());

        let stored = store.upsert_message(&message).await.unwrap();
        assert!(stored.is_some());

        let loaded = store.get_message_by_id(&message.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, message.id);
    }
}
