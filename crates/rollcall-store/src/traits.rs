//! Store trait: the abstract interface for ledger persistence.
//!
//! This trait keeps the node storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use rollcall_core::{Block, SessionId};

use crate::error::Result;

/// One persisted session-root mapping: which block sealed which session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootEntry {
    /// The sealed session.
    pub session_id: SessionId,
    /// Index of the block that notarized it.
    pub block_index: u64,
}

impl RootEntry {
    /// Create a new root entry.
    pub fn new(session_id: impl Into<SessionId>, block_index: u64) -> Self {
        Self {
            session_id: session_id.into(),
            block_index,
        }
    }
}

/// The Store trait: async interface for ledger persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, `spawn_blocking` is used internally to avoid blocking the
/// runtime.
///
/// # Design Notes
///
/// - **Append-only**: blocks and root entries are only ever appended,
///   except for `replace_blocks` (resynchronization) and `reset`.
/// - **Ordering**: `load_blocks` returns blocks in index order;
///   `load_roots` returns entries in insertion order.
/// - **Reset**: clears both the block sequence and the root entries. The
///   caller re-bootstraps genesis afterwards.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load the full persisted block sequence, ordered by index.
    ///
    /// Empty on first run.
    async fn load_blocks(&self) -> Result<Vec<Block>>;

    /// Append one block to the persisted sequence.
    async fn append_block(&self, block: &Block) -> Result<()>;

    /// Replace the whole persisted sequence (resynchronization).
    async fn replace_blocks(&self, blocks: &[Block]) -> Result<()>;

    /// Load all persisted session-root entries.
    async fn load_roots(&self) -> Result<Vec<RootEntry>>;

    /// Append one session-root entry.
    async fn append_root(&self, entry: &RootEntry) -> Result<()>;

    /// Clear blocks and roots back to the empty (pre-genesis) state.
    async fn reset(&self) -> Result<()>;
}
