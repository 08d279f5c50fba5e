//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use rollcall_core::{Attendances, Block, BlockHash, SessionId};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{RootEntry, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking to
/// avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the locked connection inside spawn_blocking.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

// Helper to convert a row to Block
fn row_to_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<Block> {
    let attendances_json: String = row.get("attendances")?;
    let prev_hash_bytes: Vec<u8> = row.get("prev_hash")?;
    let hash_bytes: Vec<u8> = row.get("hash")?;

    let attendances: Attendances = serde_json::from_str(&attendances_json).map_err(|_| {
        rusqlite::Error::InvalidColumnType(1, "attendances".into(), rusqlite::types::Type::Text)
    })?;

    Ok(Block {
        index: row.get::<_, i64>("block_index")? as u64,
        attendances,
        prev_hash: BlockHash::from_bytes(prev_hash_bytes.try_into().map_err(|_| {
            rusqlite::Error::InvalidColumnType(2, "prev_hash".into(), rusqlite::types::Type::Blob)
        })?),
        timestamp: row.get("timestamp")?,
        hash: BlockHash::from_bytes(hash_bytes.try_into().map_err(|_| {
            rusqlite::Error::InvalidColumnType(4, "hash".into(), rusqlite::types::Type::Blob)
        })?),
    })
}

// Helper to encode attendances for the TEXT column
fn encode_attendances(attendances: &Attendances) -> Result<String> {
    serde_json::to_string(attendances).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn insert_block(conn: &Connection, block: &Block) -> Result<()> {
    let attendances = encode_attendances(&block.attendances)?;
    conn.execute(
        "INSERT INTO blocks (block_index, attendances, prev_hash, timestamp, hash)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            block.index as i64,
            attendances,
            block.prev_hash.as_bytes().as_slice(),
            block.timestamp,
            block.hash.as_bytes().as_slice(),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn load_blocks(&self) -> Result<Vec<Block>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT block_index, attendances, prev_hash, timestamp, hash
                 FROM blocks ORDER BY block_index",
            )?;
            let blocks = stmt
                .query_map([], row_to_block)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(blocks)
        })
        .await
    }

    async fn append_block(&self, block: &Block) -> Result<()> {
        let block = block.clone();
        self.with_conn(move |conn| insert_block(conn, &block)).await
    }

    async fn replace_blocks(&self, blocks: &[Block]) -> Result<()> {
        let blocks = blocks.to_vec();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM blocks", [])?;
            for block in &blocks {
                insert_block(conn, block)?;
            }
            Ok(())
        })
        .await
    }

    async fn load_roots(&self) -> Result<Vec<RootEntry>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT session_id, block_index FROM roots ORDER BY rowid")?;
            let roots = stmt
                .query_map([], |row| {
                    Ok(RootEntry {
                        session_id: SessionId::new(row.get::<_, String>("session_id")?),
                        block_index: row.get::<_, i64>("block_index")? as u64,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(roots)
        })
        .await
    }

    async fn append_root(&self, entry: &RootEntry) -> Result<()> {
        let entry = entry.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO roots (session_id, block_index) VALUES (?1, ?2)",
                params![entry.session_id.as_str(), entry.block_index as i64],
            )?;
            Ok(())
        })
        .await
    }

    async fn reset(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM blocks", [])?;
            conn.execute("DELETE FROM roots", [])?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chain() -> Vec<Block> {
        let genesis = Block::genesis();
        let b1 = Block::next(&genesis, vec!["p1".into(), "p2".into()], 1_700_000_000);
        let b2 = Block::next(&b1, vec![], 1_700_000_100);
        vec![genesis, b1, b2]
    }

    #[tokio::test]
    async fn test_sqlite_block_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();

        for block in sample_chain() {
            store.append_block(&block).await.unwrap();
        }

        let loaded = store.load_blocks().await.unwrap();
        assert_eq!(loaded, sample_chain());
    }

    #[tokio::test]
    async fn test_sqlite_roots_insertion_order() {
        let store = SqliteStore::open_memory().unwrap();
        store.append_root(&RootEntry::new("S2", 2)).await.unwrap();
        store.append_root(&RootEntry::new("S1", 1)).await.unwrap();

        let roots = store.load_roots().await.unwrap();
        assert_eq!(roots[0].session_id.as_str(), "S2");
        assert_eq!(roots[1].session_id.as_str(), "S1");
    }

    #[tokio::test]
    async fn test_sqlite_replace_blocks() {
        let store = SqliteStore::open_memory().unwrap();
        let chain = sample_chain();
        store.append_block(&chain[0]).await.unwrap();

        store.replace_blocks(&chain).await.unwrap();
        assert_eq!(store.load_blocks().await.unwrap(), chain);
    }

    #[tokio::test]
    async fn test_sqlite_reset() {
        let store = SqliteStore::open_memory().unwrap();
        store.append_block(&Block::genesis()).await.unwrap();
        store.append_root(&RootEntry::new("S1", 1)).await.unwrap();

        store.reset().await.unwrap();
        assert!(store.load_blocks().await.unwrap().is_empty());
        assert!(store.load_roots().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            for block in sample_chain() {
                store.append_block(&block).await.unwrap();
            }
            store.append_root(&RootEntry::new("S1", 1)).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_blocks().await.unwrap(), sample_chain());
        assert_eq!(store.load_roots().await.unwrap().len(), 1);
    }
}
