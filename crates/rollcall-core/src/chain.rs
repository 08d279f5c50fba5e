//! Chain: the append-only, hash-linked block sequence held by a node.
//!
//! A chain grows only through validated appends. The one other mutation is
//! wholesale replacement during resynchronization; there is no in-place
//! edit and no merge.

use crate::block::Block;
use crate::error::{ChainError, Result};
use crate::validation::{validate_chain, validate_successor};

/// The attendance ledger of a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// A fresh chain holding only the genesis block.
    pub fn bootstrap() -> Self {
        Self {
            blocks: vec![Block::genesis()],
        }
    }

    /// Build a chain from persisted or received blocks, validating
    /// end-to-end (genesis shape plus every adjacent link).
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        validate_chain(&blocks)?;
        Ok(Self { blocks })
    }

    /// The most recent block.
    pub fn latest(&self) -> Result<&Block> {
        self.blocks.last().ok_or(ChainError::EmptyLedger)
    }

    /// Append a block after validating it against the current latest.
    pub fn append(&mut self, block: Block) -> Result<()> {
        validate_successor(&block, self.latest()?)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Adopt another chain wholesale.
    ///
    /// Callers validate the replacement first ([`Chain::from_blocks`] does
    /// so). No fork-choice rule is applied.
    pub fn replace(&mut self, other: Chain) {
        self.blocks = other.blocks;
    }

    /// The block at a given index.
    ///
    /// Chain invariants make position and index coincide.
    pub fn block_at(&self, index: u64) -> Result<&Block> {
        self.blocks
            .get(index as usize)
            .ok_or(ChainError::IndexOutOfRange {
                index,
                len: self.blocks.len(),
            })
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True when the chain holds no blocks (never the case post-bootstrap).
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All blocks, in order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Attendances;
    use crate::error::InvalidBlockError;

    #[test]
    fn test_bootstrap_is_single_genesis() {
        let chain = Chain::bootstrap();
        assert_eq!(chain.len(), 1);
        assert!(chain.latest().unwrap().attendances.is_genesis());
    }

    #[test]
    fn test_append_valid_block() {
        let mut chain = Chain::bootstrap();
        let block = Block::next(chain.latest().unwrap(), vec!["p".into()], 1_700_000_000);

        chain.append(block.clone()).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.latest().unwrap(), &block);
    }

    #[test]
    fn test_append_rejects_invalid_block() {
        let mut chain = Chain::bootstrap();
        let mut block = Block::next(chain.latest().unwrap(), vec!["p".into()], 1_700_000_000);
        block.attendances = Attendances::Proofs(vec!["forged".into()]);

        let result = chain.append(block);
        assert!(matches!(
            result,
            Err(ChainError::InvalidBlock(InvalidBlockError::HashMismatch { .. }))
        ));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_block_at() {
        let mut chain = Chain::bootstrap();
        let block = Block::next(chain.latest().unwrap(), vec!["p".into()], 1_700_000_000);
        chain.append(block.clone()).unwrap();

        assert_eq!(chain.block_at(1).unwrap(), &block);
        assert_eq!(
            chain.block_at(9),
            Err(ChainError::IndexOutOfRange { index: 9, len: 2 })
        );
    }

    #[test]
    fn test_from_blocks_validates() {
        let mut chain = Chain::bootstrap();
        for i in 1..4 {
            let block = Block::next(
                chain.latest().unwrap(),
                vec![format!("p{i}")],
                1_700_000_000 + i,
            );
            chain.append(block).unwrap();
        }

        let blocks = chain.blocks().to_vec();
        let rebuilt = Chain::from_blocks(blocks.clone()).unwrap();
        assert_eq!(rebuilt, chain);

        let mut tampered = blocks;
        tampered[2].timestamp += 1;
        assert!(Chain::from_blocks(tampered).is_err());
    }

    #[test]
    fn test_replace_adopts_wholesale() {
        let mut ours = Chain::bootstrap();

        let mut theirs = Chain::bootstrap();
        for i in 1..5 {
            let block = Block::next(
                theirs.latest().unwrap(),
                vec![format!("p{i}")],
                1_700_000_000 + i,
            );
            theirs.append(block).unwrap();
        }

        ours.replace(theirs.clone());
        assert_eq!(ours, theirs);
    }
}
