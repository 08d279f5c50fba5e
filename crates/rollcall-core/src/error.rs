//! Error types for the rollcall core.

use thiserror::Error;

use crate::types::BlockHash;

/// Reasons a candidate block fails successor validation.
///
/// The three checks are independent and evaluated in order so the caller
/// always learns which specific invariant broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidBlockError {
    #[error("wrong index: expected {expected}, got {got}")]
    WrongIndex { expected: u64, got: u64 },

    #[error("prev hash does not match predecessor: expected {expected}, got {got}")]
    WrongPrevHash { expected: BlockHash, got: BlockHash },

    #[error("stored hash does not recompute: stored {stored}, computed {computed}")]
    HashMismatch { stored: BlockHash, computed: BlockHash },
}

/// Errors that can occur during chain operations.
///
/// `EmptyLedger` and `IndexOutOfRange` indicate broken initialization
/// invariants; `InvalidBlock` is an expected, recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("invalid block: {0}")]
    InvalidBlock(#[from] InvalidBlockError),

    #[error("ledger is empty")]
    EmptyLedger,

    #[error("block index {index} out of range (chain length {len})")]
    IndexOutOfRange { index: u64, len: usize },

    #[error("chain does not begin with a genesis block")]
    MissingGenesis,
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
