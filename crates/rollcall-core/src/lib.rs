//! # Rollcall Core
//!
//! Pure primitives for the rollcall attendance ledger: blocks, the
//! hash-linked chain, and validation.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over the ledger data structures.
//!
//! ## Key Types
//!
//! - [`Block`] - One sealed session's attendance proofs
//! - [`Attendances`] - Proof list or the genesis marker
//! - [`Chain`] - The append-only block sequence held by a node
//! - [`BlockHash`] - 32-byte Blake3 hash over the canonical pre-image
//! - [`SessionId`] - Opaque session identifier
//!
//! ## Hashing
//!
//! Block hashes are computed over a domain-separated, length-prefixed
//! pre-image. See the [`canonical`] module.

pub mod block;
pub mod canonical;
pub mod chain;
pub mod error;
pub mod types;
pub mod validation;

pub use block::{Attendances, Block, GENESIS_TIMESTAMP};
pub use canonical::{block_preimage, compute_hash};
pub use chain::Chain;
pub use error::{ChainError, InvalidBlockError};
pub use types::{BlockHash, SessionId};
pub use validation::{is_valid_successor, validate_chain, validate_successor};
