//! Main-text stream callbacks
//!
//! Translates text lifecycle events (start / chunk / complete) into block
//! manager operations. This is the representative content kind; the other
//! kinds follow the same start/chunk/complete shape.

use anyhow::Result;
use std::sync::Arc;

use crate::storage::ids::{BlockId, MessageId};
use crate::storage::traits::BlockStore;
use crate::storage::types::{
    Block, BlockPatch, BlockStatus, BlockType, CitationReference, SearchSource,
};
use crate::streaming::block_manager::BlockManager;

/// Cached citation-source lookup, keyed by citation block ID
///
/// Chunks arrive many times a second; without this, every chunk would read
/// the citation block back from the store just to learn its source.
struct CachedCitation {
    block_id: BlockId,
    source: SearchSource,
}

/// Per-stream text callback state
pub struct TextCallbacks {
    blocks: Arc<dyn BlockStore>,
    message_id: MessageId,
    main_text_block_id: Option<BlockId>,
    cached_citation: Option<CachedCitation>,
}

impl TextCallbacks {
    pub fn new(blocks: Arc<dyn BlockStore>, message_id: MessageId) -> Self {
        Self {
            blocks,
            message_id,
            main_text_block_id: None,
            cached_citation: None,
        }
    }

    /// The running main-text block, if a segment is in flight
    pub fn main_text_block_id(&self) -> Option<&BlockId> {
        self.main_text_block_id.as_ref()
    }

    /// A text segment is starting
    ///
    /// Reclassifies an active `Unknown` placeholder in place, forcing an
    /// immediate flush so no reader sees the stale placeholder; otherwise
    /// creates and registers a fresh main-text block.
    pub async fn on_text_start(&mut self, manager: &mut BlockManager) -> Result<()> {
        if let Some(block_id) = manager.initial_placeholder_block_id().cloned() {
            let changes = BlockPatch {
                kind: Some(BlockType::MainText),
                content: Some(String::new()),
                status: Some(BlockStatus::Streaming),
                ..BlockPatch::default()
            };
            self.main_text_block_id = Some(block_id.clone());
            manager
                .smart_block_update(&block_id, changes, BlockType::MainText, true)
                .await?;
        } else if self.main_text_block_id.is_none() {
            let block = Block::main_text(self.message_id.clone(), "", BlockStatus::Streaming);
            self.main_text_block_id = Some(block.id.clone());
            manager
                .handle_block_transition(block, BlockType::MainText)
                .await?;
        }
        Ok(())
    }

    /// A cumulative text chunk arrived
    ///
    /// `text` is the full accumulated text so far, not a diff. An empty
    /// chunk is a no-op. When a citation block is active its reference is
    /// attached to the change set.
    pub async fn on_text_chunk(
        &mut self,
        manager: &mut BlockManager,
        citation_block_id: Option<&BlockId>,
        text: &str,
    ) -> Result<()> {
        let citation = match citation_block_id {
            Some(id) => Some(self.resolve_citation(id).await?),
            None => {
                self.cached_citation = None;
                None
            }
        };

        if text.is_empty() {
            return Ok(());
        }

        let Some(block_id) = self.main_text_block_id.clone() else {
            tracing::warn!("Received text chunk with no running main text block");
            return Ok(());
        };

        let changes = BlockPatch {
            content: Some(text.to_string()),
            status: Some(BlockStatus::Streaming),
            citation_references: Some(citation.into_iter().collect()),
            ..BlockPatch::default()
        };
        manager
            .smart_block_update(&block_id, changes, BlockType::MainText, false)
            .await
    }

    /// The text segment completed with its final cumulative text
    pub async fn on_text_complete(
        &mut self,
        manager: &mut BlockManager,
        final_text: &str,
    ) -> Result<()> {
        match self.main_text_block_id.take() {
            Some(block_id) => {
                let changes = BlockPatch {
                    content: Some(final_text.to_string()),
                    status: Some(BlockStatus::Success),
                    ..BlockPatch::default()
                };
                manager
                    .smart_block_update(&block_id, changes, BlockType::MainText, true)
                    .await
            }
            None => {
                tracing::warn!(
                    "Received text.complete but no main text block is running (last block type {:?})",
                    manager.last_block_type()
                );
                Ok(())
            }
        }
    }

    /// Resolve the citation block's result source, reading the store at
    /// most once per citation block ID
    async fn resolve_citation(&mut self, citation_block_id: &BlockId) -> Result<CitationReference> {
        if let Some(cached) = &self.cached_citation {
            if cached.block_id == *citation_block_id {
                return Ok(CitationReference {
                    citation_block_id: citation_block_id.clone(),
                    citation_block_source: cached.source,
                });
            }
        }

        let source = self
            .blocks
            .get_block_by_id(citation_block_id)
            .await?
            .and_then(|block| block.search_source)
            .unwrap_or_default();

        self.cached_citation = Some(CachedCitation {
            block_id: citation_block_id.clone(),
            source,
        });

        Ok(CitationReference {
            citation_block_id: citation_block_id.clone(),
            citation_block_source: source,
        })
    }
}
