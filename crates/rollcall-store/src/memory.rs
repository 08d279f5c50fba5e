//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite but
//! keeps everything in memory with no persistence.

use std::sync::RwLock;

use async_trait::async_trait;
use rollcall_core::Block;

use crate::error::Result;
use crate::traits::{RootEntry, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    blocks: Vec<Block>,
    roots: Vec<RootEntry>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_blocks(&self) -> Result<Vec<Block>> {
        let inner = self.inner.read().unwrap();
        let mut blocks = inner.blocks.clone();
        blocks.sort_by_key(|b| b.index);
        Ok(blocks)
    }

    async fn append_block(&self, block: &Block) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.blocks.push(block.clone());
        Ok(())
    }

    async fn replace_blocks(&self, blocks: &[Block]) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.blocks = blocks.to_vec();
        Ok(())
    }

    async fn load_roots(&self) -> Result<Vec<RootEntry>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.roots.clone())
    }

    async fn append_root(&self, entry: &RootEntry) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.roots.push(entry.clone());
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.blocks.clear();
        inner.roots.clear();
        Ok(())
    }
}
