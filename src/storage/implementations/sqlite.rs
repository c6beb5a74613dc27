//! SQLite block/message store
//!
//! Durable backend behind the `sqlite` feature. One shared connection,
//! guarded by a mutex, serialized columns for the list-valued fields.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::storage::ids::{BlockId, MessageId, TopicId};
use crate::storage::traits::{BlockStore, MessageStore};
use crate::storage::types::{Block, BlockPatch, Message};

/// SQLite-backed store implementing both `BlockStore` and `MessageStore`
///
/// Create one store and share it via `Arc` across all components that need
/// database access.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(&path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (useful for tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            -- Message blocks
            CREATE TABLE IF NOT EXISTS blocks (
                id TEXT PRIMARY KEY,
                message_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                content TEXT NOT NULL,
                citation_references TEXT NOT NULL,
                search_source TEXT,
                thinking_ms INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_blocks_message ON blocks(message_id);

            -- Messages
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                topic_id TEXT NOT NULL,
                status TEXT NOT NULL,
                block_ids TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_topic ON messages(topic_id);
            "#,
        )?;
        Ok(())
    }
}

#[async_trait]
impl BlockStore for SqliteStore {
    async fn get_block_by_id(&self, id: &BlockId) -> Result<Option<Block>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, message_id, kind, status, content, citation_references,
                    search_source, thinking_ms, created_at, updated_at
             FROM blocks WHERE id = ?1",
            params![id.as_str()],
            |row| {
                let id: BlockId = row.get(0)?;
                let message_id: MessageId = row.get(1)?;
                let kind: String = row.get(2)?;
                let status: String = row.get(3)?;
                let content: String = row.get(4)?;
                let citation_references: String = row.get(5)?;
                let search_source: Option<String> = row.get(6)?;
                let thinking_ms: Option<i64> = row.get(7)?;
                let created_at: i64 = row.get(8)?;
                let updated_at: i64 = row.get(9)?;
                Ok((
                    id,
                    message_id,
                    kind,
                    status,
                    content,
                    citation_references,
                    search_source,
                    thinking_ms,
                    created_at,
                    updated_at,
                ))
            },
        );

        match result {
            Ok((
                id,
                message_id,
                kind,
                status,
                content,
                citation_references,
                search_source,
                thinking_ms,
                created_at,
                updated_at,
            )) => Ok(Some(Block {
                id,
                message_id,
                kind: kind
                    .parse()
                    .map_err(|_| anyhow!("unknown block kind: {kind}"))?,
                status: status
                    .parse()
                    .map_err(|_| anyhow!("unknown block status: {status}"))?,
                content,
                citation_references: serde_json::from_str(&citation_references)?,
                search_source: match search_source {
                    Some(s) => Some(
                        s.parse()
                            .map_err(|_| anyhow!("unknown search source: {s}"))?,
                    ),
                    None => None,
                },
                thinking_ms,
                created_at,
                updated_at,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_blocks(&self, blocks: &[Block]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        for block in blocks {
            let citation_references = serde_json::to_string(&block.citation_references)?;
            let search_source = block.search_source.map(|s| s.as_str());
            conn.execute(
                "INSERT OR REPLACE INTO blocks
                 (id, message_id, kind, status, content, citation_references,
                  search_source, thinking_ms, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    block.id.as_str(),
                    block.message_id.as_str(),
                    block.kind.as_str(),
                    block.status.as_str(),
                    block.content,
                    citation_references,
                    search_source,
                    block.thinking_ms,
                    block.created_at,
                    block.updated_at,
                ],
            )?;
        }
        Ok(())
    }

    async fn update_one_block(&self, id: &BlockId, changes: &BlockPatch) -> Result<()> {
        // Read-modify-write; a missing row is left untouched.
        let Some(existing) = self.get_block_by_id(id).await? else {
            return Ok(());
        };
        let merged = existing.with_changes(changes);
        self.upsert_blocks(std::slice::from_ref(&merged)).await
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn get_message_by_id(&self, id: &MessageId) -> Result<Option<Message>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, topic_id, status, block_ids, created_at, updated_at
             FROM messages WHERE id = ?1",
            params![id.as_str()],
            |row| {
                let id: MessageId = row.get(0)?;
                let topic_id: TopicId = row.get(1)?;
                let status: String = row.get(2)?;
                let block_ids: String = row.get(3)?;
                let created_at: i64 = row.get(4)?;
                let updated_at: i64 = row.get(5)?;
                Ok((id, topic_id, status, block_ids, created_at, updated_at))
            },
        );

        match result {
            Ok((id, topic_id, status, block_ids, created_at, updated_at)) => Ok(Some(Message {
                id,
                topic_id,
                status: status
                    .parse()
                    .map_err(|_| anyhow!("unknown message status: {status}"))?,
                block_ids: serde_json::from_str(&block_ids)?,
                created_at,
                updated_at,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_message(&self, message: &Message) -> Result<Option<Message>> {
        let block_ids = serde_json::to_string(&message.block_ids)?;
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT OR REPLACE INTO messages
                 (id, topic_id, status, block_ids, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.id.as_str(),
                    message.topic_id.as_str(),
                    message.status.as_str(),
                    block_ids,
                    message.created_at,
                    message.updated_at,
                ],
            )?;
        }
        self.get_message_by_id(&message.id).await
    }
}
