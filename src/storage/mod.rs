//! Storage abstractions for block and message persistence
//!
//! This module provides the traits the streaming engine persists through
//! and two interchangeable implementations:
//!
//! - `MemoryStore` - In-memory storage (default, no persistence)
//! - `SqliteStore` - SQLite-backed storage (requires `sqlite` feature)

pub mod helper;
pub mod ids;
pub mod implementations;
pub mod traits;
pub mod types;

pub use ids::{BlockId, MessageId, TopicId};
pub use implementations::MemoryStore;
#[cfg(feature = "sqlite")]
pub use implementations::SqliteStore;
pub use traits::{BlockStore, MessageStore};
pub use types::{
    Block, BlockPatch, BlockStatus, BlockType, CitationReference, Message, MessageStatus,
    SearchSource,
};
