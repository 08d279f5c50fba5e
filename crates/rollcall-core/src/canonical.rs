//! Canonical hash pre-image for blocks.
//!
//! The pre-image is a domain-separated, length-prefixed byte string over
//! (index, attendances, prev_hash, timestamp). No JSON is involved: the
//! encoding is unambiguous regardless of what the proof strings contain.

use crate::block::Attendances;
use crate::types::BlockHash;

/// Domain separator for block hashing.
const BLOCK_DOMAIN: &[u8] = b"rollcall-block-v0:";

/// Tag byte for the genesis attendance marker.
const TAG_GENESIS: u8 = 0x00;

/// Tag byte for a proof list.
const TAG_PROOFS: u8 = 0x01;

/// Build the canonical pre-image for a block's fields.
pub fn block_preimage(
    index: u64,
    attendances: &Attendances,
    prev_hash: &BlockHash,
    timestamp: i64,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(BLOCK_DOMAIN);
    buf.extend_from_slice(&index.to_be_bytes());

    match attendances {
        Attendances::Genesis => {
            buf.push(TAG_GENESIS);
        }
        Attendances::Proofs(proofs) => {
            buf.push(TAG_PROOFS);
            buf.extend_from_slice(&(proofs.len() as u64).to_be_bytes());
            for proof in proofs {
                buf.extend_from_slice(&(proof.len() as u64).to_be_bytes());
                buf.extend_from_slice(proof.as_bytes());
            }
        }
    }

    buf.extend_from_slice(&prev_hash.0);
    buf.extend_from_slice(&timestamp.to_be_bytes());
    buf
}

/// Compute the hash over a block's canonical pre-image.
pub fn compute_hash(
    index: u64,
    attendances: &Attendances,
    prev_hash: &BlockHash,
    timestamp: i64,
) -> BlockHash {
    let preimage = block_preimage(index, attendances, prev_hash, timestamp);
    BlockHash(*blake3::hash(&preimage).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let attendances = Attendances::Proofs(vec!["a".into(), "b".into()]);
        let h1 = compute_hash(1, &attendances, &BlockHash::ZERO, 1000);
        let h2 = compute_hash(1, &attendances, &BlockHash::ZERO, 1000);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_covers_every_field() {
        let attendances = Attendances::Proofs(vec!["a".into()]);
        let base = compute_hash(1, &attendances, &BlockHash::ZERO, 1000);

        assert_ne!(base, compute_hash(2, &attendances, &BlockHash::ZERO, 1000));
        assert_ne!(
            base,
            compute_hash(1, &Attendances::Proofs(vec!["b".into()]), &BlockHash::ZERO, 1000)
        );
        assert_ne!(
            base,
            compute_hash(1, &attendances, &BlockHash::from_bytes([1; 32]), 1000)
        );
        assert_ne!(base, compute_hash(1, &attendances, &BlockHash::ZERO, 1001));
    }

    #[test]
    fn test_length_prefix_prevents_boundary_ambiguity() {
        // ["ab", "c"] and ["a", "bc"] concatenate identically; the
        // length prefixes must keep them distinct.
        let left = Attendances::Proofs(vec!["ab".into(), "c".into()]);
        let right = Attendances::Proofs(vec!["a".into(), "bc".into()]);
        assert_ne!(
            compute_hash(1, &left, &BlockHash::ZERO, 1000),
            compute_hash(1, &right, &BlockHash::ZERO, 1000)
        );
    }

    #[test]
    fn test_genesis_marker_distinct_from_proof_named_genesis() {
        let marker = Attendances::Genesis;
        let lookalike = Attendances::Proofs(vec!["genesis".into()]);
        assert_ne!(
            compute_hash(0, &marker, &BlockHash::ZERO, 1000),
            compute_hash(0, &lookalike, &BlockHash::ZERO, 1000)
        );
    }
}
