//! Storage types
//!
//! Shared types used by storage traits and implementations.

pub mod block;
pub mod message;

// Re-exports for convenience
pub use block::{Block, BlockPatch, BlockStatus, BlockType, CitationReference, SearchSource};
pub use message::{Message, MessageStatus};
