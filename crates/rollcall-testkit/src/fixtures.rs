//! Test fixtures and helpers.
//!
//! Common setup code for chain and store tests.

use rollcall_core::{Block, Chain, SessionId};
use rollcall_store::{MemoryStore, RootEntry, Store};

/// Deterministic base timestamp for fixture blocks.
pub const BASE_TIMESTAMP: i64 = 1_700_000_000;

/// A chain with one sealed block per listed session, plus the matching
/// root entries.
pub struct ChainFixture {
    pub chain: Chain,
    pub roots: Vec<RootEntry>,
}

impl ChainFixture {
    /// Build a chain where each `(session, proofs)` pair seals one block,
    /// in order, with deterministic timestamps.
    pub fn with_sessions(sessions: &[(&str, &[&str])]) -> Self {
        let mut chain = Chain::bootstrap();
        let mut roots = Vec::new();

        for (i, (session, proofs)) in sessions.iter().enumerate() {
            let proofs: Vec<String> = proofs.iter().map(|p| p.to_string()).collect();
            let block = Block::next(
                chain.latest().expect("fixture chain has genesis"),
                proofs,
                BASE_TIMESTAMP + i as i64,
            );
            roots.push(RootEntry::new(*session, block.index));
            chain.append(block).expect("fixture blocks are valid");
        }

        Self { chain, roots }
    }

    /// The fixture's latest block.
    pub fn latest(&self) -> &Block {
        self.chain.latest().expect("fixture chain has genesis")
    }

    /// The block index recorded for a session.
    pub fn root_of(&self, session: &str) -> Option<u64> {
        let session = SessionId::new(session);
        self.roots
            .iter()
            .rev()
            .find(|entry| entry.session_id == session)
            .map(|entry| entry.block_index)
    }

    /// Preload a memory store with the fixture's blocks and roots.
    pub async fn seed_store(&self) -> MemoryStore {
        let store = MemoryStore::new();
        for block in self.chain.blocks() {
            store.append_block(block).await.expect("memory store");
        }
        for entry in &self.roots {
            store.append_root(entry).await.expect("memory store");
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::validate_chain;

    #[test]
    fn test_fixture_builds_valid_chain() {
        let fixture = ChainFixture::with_sessions(&[
            ("S1", &["proofA", "proofB"]),
            ("S2", &[]),
            ("S3", &["proofC"]),
        ]);

        assert_eq!(fixture.chain.len(), 4);
        assert!(validate_chain(fixture.chain.blocks()).is_ok());
        assert_eq!(fixture.root_of("S2"), Some(2));
        assert_eq!(fixture.root_of("missing"), None);
    }

    #[tokio::test]
    async fn test_fixture_seeds_store() {
        let fixture = ChainFixture::with_sessions(&[("S1", &["p"])]);
        let store = fixture.seed_store().await;

        assert_eq!(store.load_blocks().await.unwrap().len(), 2);
        assert_eq!(store.load_roots().await.unwrap(), fixture.roots);
    }
}
