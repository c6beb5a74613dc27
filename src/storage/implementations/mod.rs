//! Storage backends
//!
//! Two implementations of the block/message store traits:
//!
//! - `MemoryStore` - In-memory storage (default, no persistence)
//! - `SqliteStore` - SQLite-backed storage (requires `sqlite` feature)

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
