//! Streaming block assembly core for the Tessera chat client
//!
//! This crate turns an incremental, chunked stream of generated content
//! into typed, persisted blocks composing a chat message. It provides:
//!
//! - **Traits**: `BlockStore`, `MessageStore`, `WriteScheduler`, `StreamHooks`
//! - **Implementations**: `MemoryStore`, `SqliteStore` (feature `sqlite`),
//!   `ThrottledWriteScheduler`
//! - **Engine**: `BlockManager` for flush-vs-defer persistence decisions,
//!   `MessageStream` as the per-stream handle over the callback sets
//!
//! # Example
//!
//! ```ignore
//! use tessera_core::{MessageStream, MemoryStore, ThrottledWriteScheduler};
//!
//! let mut stream = MessageStream::new(store, store, scheduler, hooks, msg_id, topic_id);
//! stream.on_text_start().await?;
//! stream.on_text_chunk("Hello").await?;
//! stream.on_text_complete("Hello, world!").await?;
//! ```
pub mod scheduler;
pub mod storage;
pub mod streaming;

pub use scheduler::{ThrottledWriteScheduler, WriteScheduler};
pub use storage::{
    Block, BlockId, BlockPatch, BlockStatus, BlockStore, BlockType, CitationReference,
    MemoryStore, Message, MessageId, MessageStatus, MessageStore, SearchSource, TopicId,
};
#[cfg(feature = "sqlite")]
pub use storage::SqliteStore;
pub use streaming::{
    ActiveBlockInfo, BlockManager, MessageStream, NoopStreamHooks, StreamHooks, TextCallbacks,
    ThinkingCallbacks,
};
