//! Streaming block assembly
//!
//! Consumes an incremental, chunked content stream and materializes it into
//! typed, persisted blocks composing one chat message:
//!
//! - `BlockManager` - flush-vs-defer decision, merge, cache, message status
//! - `TextCallbacks` / `ThinkingCallbacks` - per-kind lifecycle handlers
//! - `MessageStream` - the single-owner per-stream handle

pub mod block_manager;
pub mod callbacks;
pub mod stream;


pub use block_manager::{ActiveBlockInfo, BlockManager, NoopStreamHooks, StreamHooks};
pub use callbacks::{TextCallbacks, ThinkingCallbacks};
pub use stream::MessageStream;
