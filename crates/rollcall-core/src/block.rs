//! Block: one sealed session's attendance proofs, hash-linked to its
//! predecessor.
//!
//! A block is immutable once created. Its `hash` field always recomputes
//! from the other four fields; anything else is tampering.

use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::canonical::compute_hash;
use crate::types::BlockHash;

/// Timestamp of the genesis block, fixed so genesis hashes identically on
/// every node.
pub const GENESIS_TIMESTAMP: i64 = 1_516_459_421;

/// Wire marker carried by the genesis block in place of a proof list.
const GENESIS_MARKER: &str = "genesis";

/// The attendance payload of a block.
///
/// Index 0 carries the fixed genesis marker; every other block carries the
/// proof strings collected while its session was open. Duplicates are
/// allowed; membership is what verification asks about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attendances {
    /// The genesis sentinel (index 0 only).
    Genesis,
    /// Opaque attendance-proof strings, in submission order.
    Proofs(Vec<String>),
}

impl Attendances {
    /// Check whether a proof is present.
    pub fn contains(&self, proof: &str) -> bool {
        match self {
            Attendances::Genesis => false,
            Attendances::Proofs(proofs) => proofs.iter().any(|p| p == proof),
        }
    }

    /// Number of proofs (zero for the genesis marker).
    pub fn len(&self) -> usize {
        match self {
            Attendances::Genesis => 0,
            Attendances::Proofs(proofs) => proofs.len(),
        }
    }

    /// True when no proofs are present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for the genesis marker.
    pub fn is_genesis(&self) -> bool {
        matches!(self, Attendances::Genesis)
    }
}

// On the wire the genesis marker is the bare string "genesis" and a proof
// list is a plain JSON array, matching the frames peers exchange.
impl Serialize for Attendances {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Attendances::Genesis => serializer.serialize_str(GENESIS_MARKER),
            Attendances::Proofs(proofs) => proofs.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Attendances {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttendancesVisitor;

        impl<'de> Visitor<'de> for AttendancesVisitor {
            type Value = Attendances;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("the string \"genesis\" or an array of proof strings")
            }

            fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Attendances, E> {
                if value == GENESIS_MARKER {
                    Ok(Attendances::Genesis)
                } else {
                    Err(E::custom(format!("unknown attendance marker: {value:?}")))
                }
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Attendances, A::Error> {
                let mut proofs = Vec::new();
                while let Some(proof) = seq.next_element::<String>()? {
                    proofs.push(proof);
                }
                Ok(Attendances::Proofs(proofs))
            }
        }

        deserializer.deserialize_any(AttendancesVisitor)
    }
}

/// One block of the attendance ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position in the chain; 0 is genesis.
    pub index: u64,

    /// The sealed attendance proofs (or the genesis marker).
    pub attendances: Attendances,

    /// Hash of the preceding block; `BlockHash::ZERO` for genesis.
    pub prev_hash: BlockHash,

    /// Creation time, seconds since epoch.
    pub timestamp: i64,

    /// Hash over (index, attendances, prev_hash, timestamp).
    pub hash: BlockHash,
}

impl Block {
    /// The fixed genesis block. Identical on every node.
    pub fn genesis() -> Self {
        let attendances = Attendances::Genesis;
        let hash = compute_hash(0, &attendances, &BlockHash::ZERO, GENESIS_TIMESTAMP);
        Self {
            index: 0,
            attendances,
            prev_hash: BlockHash::ZERO,
            timestamp: GENESIS_TIMESTAMP,
            hash,
        }
    }

    /// Seal the next block after `prev` with the given proofs.
    pub fn next(prev: &Block, proofs: Vec<String>, timestamp: i64) -> Self {
        let index = prev.index + 1;
        let attendances = Attendances::Proofs(proofs);
        let hash = compute_hash(index, &attendances, &prev.hash, timestamp);
        Self {
            index,
            attendances,
            prev_hash: prev.hash,
            timestamp,
            hash,
        }
    }

    /// Recompute the hash from the block's own fields.
    ///
    /// Equal to `self.hash` for every untampered block.
    pub fn compute_hash(&self) -> BlockHash {
        compute_hash(self.index, &self.attendances, &self.prev_hash, self.timestamp)
    }
}
