//! Root index: which block sealed which session.
//!
//! Rebuilt from the persisted entry list at startup; grows by one entry per
//! sealed session and is cleared only by a ledger reset.

use std::collections::HashMap;

use rollcall_core::SessionId;
use rollcall_store::RootEntry;

/// In-memory session -> block-index mapping.
#[derive(Debug, Default)]
pub struct RootIndex {
    map: HashMap<SessionId, u64>,
}

impl RootIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries. Later entries overwrite earlier
    /// ones, matching insertion order.
    pub fn from_entries(entries: &[RootEntry]) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.record(entry.session_id.clone(), entry.block_index);
        }
        index
    }

    /// Look up the sealing block index for a session.
    pub fn lookup(&self, session: &SessionId) -> Option<u64> {
        self.map.get(session).copied()
    }

    /// Insert or overwrite the mapping for a session.
    pub fn record(&mut self, session: SessionId, block_index: u64) {
        self.map.insert(session, block_index);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Number of mapped sessions.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no session is mapped.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
