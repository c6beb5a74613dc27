//! Message types and block-status-driven message status derivation

use serde::{Deserialize, Serialize};

use crate::storage::helper::unix_timestamp;
use crate::storage::ids::{BlockId, MessageId, TopicId};
use crate::storage::types::block::BlockStatus;

// ============================================================================
// Message Status
// ============================================================================

/// Lifecycle status of a whole message, derived from its blocks' statuses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Created, no block activity yet
    Pending,
    /// At least one block is actively streaming or processing
    Processing,
    /// Completed
    Success,
    /// Failed; terminal for this subsystem
    Error,
}

impl MessageStatus {
    /// Get static string representation (zero allocation)
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Processing => "processing",
            MessageStatus::Success => "success",
            MessageStatus::Error => "error",
        }
    }

    /// Derive the next message status from a block's status
    ///
    /// Returns `None` when the message status should not change. The full
    /// transition table:
    ///
    /// - `Error` messages never change again.
    /// - A failed block fails the message.
    /// - A successful block promotes the message only from `Pending`; a
    ///   message already `Processing` or `Success` is left alone.
    /// - A streaming or processing block marks the message `Processing`.
    pub fn advanced_by(self, block: BlockStatus) -> Option<MessageStatus> {
        match (self, block) {
            (MessageStatus::Error, _) => None,
            (_, BlockStatus::Error) => Some(MessageStatus::Error),
            (MessageStatus::Pending, BlockStatus::Success) => Some(MessageStatus::Success),
            (_, BlockStatus::Success) => None,
            (_, BlockStatus::Processing | BlockStatus::Streaming) => {
                Some(MessageStatus::Processing)
            }
            (_, BlockStatus::Pending) => None,
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MessageStatus::Pending),
            "processing" => Ok(MessageStatus::Processing),
            "success" => Ok(MessageStatus::Success),
            "error" => Ok(MessageStatus::Error),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// A chat message: an ordered collection of block IDs plus derived status
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier
    pub id: MessageId,
    /// Owning topic
    pub topic_id: TopicId,
    /// Derived lifecycle status
    pub status: MessageStatus,
    /// Ordered blocks composing this message
    pub block_ids: Vec<BlockId>,
    /// Unix timestamp (milliseconds) when created
    pub created_at: i64,
    /// Unix timestamp (milliseconds) of the last update
    pub updated_at: i64,
}

impl Message {
    /// Create a new pending message in a topic
    pub fn new(topic_id: TopicId) -> Self {
        let now = unix_timestamp();
        Self {
            id: MessageId::new(),
            topic_id,
            status: MessageStatus::Pending,
            block_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a block to the message's ordered collection
    pub fn push_block(&mut self, block_id: BlockId) {
        self.block_ids.push(block_id);
        self.updated_at = unix_timestamp();
    }
}
