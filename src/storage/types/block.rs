//! Message block types
//!
//! A block is a typed, independently-statused unit of a chat message's
//! content. Messages own an ordered list of block IDs; blocks are created
//! once (as a typed block or an `Unknown` placeholder) and move through
//! their status lifecycle while a stream fills them in.

use serde::{Deserialize, Serialize};

use crate::storage::helper::unix_timestamp;
use crate::storage::ids::{BlockId, MessageId};

// ============================================================================
// Block Type
// ============================================================================

/// Content kind of a block
///
/// `Unknown` is the placeholder kind: a block created before the stream has
/// revealed what it will carry, reclassified in place by the first chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// Main response text
    MainText,
    /// Model reasoning text
    Thinking,
    /// Citation / search-result references
    Citation,
    /// Tool call and result
    Tool,
    /// Image content
    Image,
    /// Placeholder, kind not yet known
    Unknown,
}

impl BlockType {
    /// Get static string representation (zero allocation)
    pub const fn as_str(&self) -> &'static str {
        match self {
            BlockType::MainText => "main_text",
            BlockType::Thinking => "thinking",
            BlockType::Citation => "citation",
            BlockType::Tool => "tool",
            BlockType::Image => "image",
            BlockType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main_text" => Ok(BlockType::MainText),
            "thinking" => Ok(BlockType::Thinking),
            "citation" => Ok(BlockType::Citation),
            "tool" => Ok(BlockType::Tool),
            "image" => Ok(BlockType::Image),
            "unknown" => Ok(BlockType::Unknown),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Block Status
// ============================================================================

/// Lifecycle status of a single block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    /// Created, nothing received yet
    Pending,
    /// Receiving streamed chunks
    Streaming,
    /// Post-stream work in progress (e.g. a running tool call)
    Processing,
    /// Complete
    Success,
    /// Failed
    Error,
}

impl BlockStatus {
    /// Get static string representation (zero allocation)
    pub const fn as_str(&self) -> &'static str {
        match self {
            BlockStatus::Pending => "pending",
            BlockStatus::Streaming => "streaming",
            BlockStatus::Processing => "processing",
            BlockStatus::Success => "success",
            BlockStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BlockStatus::Pending),
            "streaming" => Ok(BlockStatus::Streaming),
            "processing" => Ok(BlockStatus::Processing),
            "success" => Ok(BlockStatus::Success),
            "error" => Ok(BlockStatus::Error),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Citation references
// ============================================================================

/// Where a citation block's results came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSource {
    /// Web search results
    #[default]
    WebSearch,
    /// Local knowledge-base hits
    Knowledge,
}

impl SearchSource {
    /// Get static string representation (zero allocation)
    pub const fn as_str(&self) -> &'static str {
        match self {
            SearchSource::WebSearch => "web_search",
            SearchSource::Knowledge => "knowledge",
        }
    }
}

impl std::str::FromStr for SearchSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web_search" => Ok(SearchSource::WebSearch),
            "knowledge" => Ok(SearchSource::Knowledge),
            _ => Err(()),
        }
    }
}

/// Link from a streaming text block to the citation block backing it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationReference {
    /// The citation block being referenced
    pub citation_block_id: BlockId,
    /// Source of that citation block's results
    pub citation_block_source: SearchSource,
}

// ============================================================================
// Block
// ============================================================================

/// A typed, ordered unit of message content
///
/// `id` and `message_id` are assigned at creation and never altered by a
/// merge, regardless of what a change set supplies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    /// Unique identifier
    pub id: BlockId,
    /// Owning message
    pub message_id: MessageId,
    /// Content kind
    pub kind: BlockType,
    /// Lifecycle status
    pub status: BlockStatus,
    /// Accumulated payload; for `MainText` the cumulative text, not a diff
    pub content: String,
    /// Citation links attached while the block streams
    pub citation_references: Vec<CitationReference>,
    /// Result source, populated on `Citation` blocks
    pub search_source: Option<SearchSource>,
    /// Elapsed reasoning time, populated on `Thinking` blocks
    pub thinking_ms: Option<i64>,
    /// Unix timestamp (milliseconds) when created
    pub created_at: i64,
    /// Unix timestamp (milliseconds), refreshed on every merge
    pub updated_at: i64,
}

impl Block {
    fn new(message_id: MessageId, kind: BlockType, status: BlockStatus) -> Self {
        let now = unix_timestamp();
        Self {
            id: BlockId::new(),
            message_id,
            kind,
            status,
            content: String::new(),
            citation_references: Vec::new(),
            search_source: None,
            thinking_ms: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an `Unknown` placeholder block, to be reclassified in place
    pub fn placeholder(message_id: MessageId) -> Self {
        Self::new(message_id, BlockType::Unknown, BlockStatus::Processing)
    }

    /// Create a main-text block
    pub fn main_text(message_id: MessageId, content: impl Into<String>, status: BlockStatus) -> Self {
        Self {
            content: content.into(),
            ..Self::new(message_id, BlockType::MainText, status)
        }
    }

    /// Create a thinking block
    pub fn thinking(message_id: MessageId, status: BlockStatus) -> Self {
        Self::new(message_id, BlockType::Thinking, status)
    }

    /// Create a citation block with a known result source
    pub fn citation(message_id: MessageId, source: SearchSource) -> Self {
        Self {
            search_source: Some(source),
            ..Self::new(message_id, BlockType::Citation, BlockStatus::Processing)
        }
    }

    /// Apply a partial change set, returning the merged snapshot
    ///
    /// Identity fields (`id`, `message_id`, `created_at`) are taken from
    /// `self`; `updated_at` is stamped from the change set or the clock.
    pub fn with_changes(&self, changes: &BlockPatch) -> Block {
        Block {
            id: self.id.clone(),
            message_id: self.message_id.clone(),
            kind: changes.kind.unwrap_or(self.kind),
            status: changes.status.unwrap_or(self.status),
            content: changes.content.clone().unwrap_or_else(|| self.content.clone()),
            citation_references: changes
                .citation_references
                .clone()
                .unwrap_or_else(|| self.citation_references.clone()),
            search_source: changes.search_source.or(self.search_source),
            thinking_ms: changes.thinking_ms.or(self.thinking_ms),
            created_at: self.created_at,
            updated_at: changes.updated_at.unwrap_or_else(unix_timestamp),
        }
    }
}

// ============================================================================
// BlockPatch
// ============================================================================

/// A partial change set for a block
///
/// Carries no `id` or `message_id`: a merge cannot rewrite block identity
/// no matter what the stream hands us.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlockPatch {
    /// New content kind (placeholder reclassification)
    pub kind: Option<BlockType>,
    /// New lifecycle status
    pub status: Option<BlockStatus>,
    /// Replacement cumulative content
    pub content: Option<String>,
    /// Replacement citation links
    pub citation_references: Option<Vec<CitationReference>>,
    /// Result source (citation blocks)
    pub search_source: Option<SearchSource>,
    /// Elapsed reasoning time (thinking blocks)
    pub thinking_ms: Option<i64>,
    /// Merge timestamp; stamped by the block manager when absent
    pub updated_at: Option<i64>,
}

impl BlockPatch {
    /// Fold a later patch over this one, the later fields winning
    ///
    /// Used by the deferred-write scheduler to coalesce every change that
    /// lands inside one throttle window into a single store write.
    pub fn overlay(&mut self, later: BlockPatch) {
        if later.kind.is_some() {
            self.kind = later.kind;
        }
        if later.status.is_some() {
            self.status = later.status;
        }
        if later.content.is_some() {
            self.content = later.content;
        }
        if later.citation_references.is_some() {
            self.citation_references = later.citation_references;
        }
        if later.search_source.is_some() {
            self.search_source = later.search_source;
        }
        if later.thinking_ms.is_some() {
            self.thinking_ms = later.thinking_ms;
        }
        if later.updated_at.is_some() {
            self.updated_at = later.updated_at;
        }
    }
}
