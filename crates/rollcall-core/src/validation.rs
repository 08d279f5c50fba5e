//! Successor and whole-chain validation.

use crate::block::Block;
use crate::error::{ChainError, InvalidBlockError};
use crate::types::BlockHash;

/// Validate that `candidate` is the legitimate successor of `prev`.
///
/// Three independent checks, reported specifically:
/// - the index increments by exactly one,
/// - `prev_hash` matches the predecessor's hash,
/// - the stored hash recomputes from the candidate's own fields.
pub fn validate_successor(candidate: &Block, prev: &Block) -> Result<(), InvalidBlockError> {
    if candidate.index != prev.index + 1 {
        return Err(InvalidBlockError::WrongIndex {
            expected: prev.index + 1,
            got: candidate.index,
        });
    }

    if candidate.prev_hash != prev.hash {
        return Err(InvalidBlockError::WrongPrevHash {
            expected: prev.hash,
            got: candidate.prev_hash,
        });
    }

    let computed = candidate.compute_hash();
    if computed != candidate.hash {
        return Err(InvalidBlockError::HashMismatch {
            stored: candidate.hash,
            computed,
        });
    }

    Ok(())
}

/// Boolean form of [`validate_successor`].
pub fn is_valid_successor(candidate: &Block, prev: &Block) -> bool {
    validate_successor(candidate, prev).is_ok()
}

/// Validate a whole chain end-to-end.
///
/// The first block must be genesis-shaped (index 0, zero prev-hash, hash
/// recomputes); every adjacent pair must satisfy [`validate_successor`].
pub fn validate_chain(blocks: &[Block]) -> Result<(), ChainError> {
    let first = blocks.first().ok_or(ChainError::EmptyLedger)?;

    if first.index != 0 || first.prev_hash != BlockHash::ZERO {
        return Err(ChainError::MissingGenesis);
    }
    let computed = first.compute_hash();
    if computed != first.hash {
        return Err(InvalidBlockError::HashMismatch {
            stored: first.hash,
            computed,
        }
        .into());
    }

    for pair in blocks.windows(2) {
        validate_successor(&pair[1], &pair[0])?;
    }

    Ok(())
}
