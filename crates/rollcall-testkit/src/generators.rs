//! Proptest generators for ledger data.

use proptest::prelude::*;

use rollcall_core::{Block, Chain};

use crate::fixtures::BASE_TIMESTAMP;

/// A single opaque attendance proof.
pub fn proof() -> impl Strategy<Value = String> {
    "[a-f0-9]{8,64}"
}

/// A proof list as submitted during one session (may be empty, may contain
/// duplicates).
pub fn proofs(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(proof(), 0..=max)
}

/// A valid chain of up to `max_blocks` sealed blocks after genesis.
pub fn chain(max_blocks: usize) -> impl Strategy<Value = Chain> {
    prop::collection::vec(proofs(4), 0..=max_blocks).prop_map(|per_block| {
        let mut chain = Chain::bootstrap();
        for (i, proofs) in per_block.into_iter().enumerate() {
            let block = Block::next(
                chain.latest().expect("generated chain has genesis"),
                proofs,
                BASE_TIMESTAMP + i as i64,
            );
            chain.append(block).expect("generated blocks are valid");
        }
        chain
    })
}
