//! # Rollcall Store
//!
//! Persistence for the rollcall ledger: the block sequence and the
//! session-root entries.
//!
//! ## Backends
//!
//! - [`SqliteStore`] - primary backend (rusqlite, bundled)
//! - [`MemoryStore`] - in-memory, for tests
//!
//! Both expose the same narrow interface: load at startup, append as the
//! chain grows, replace on resynchronization, reset back to the empty
//! state.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{RootEntry, Store};
