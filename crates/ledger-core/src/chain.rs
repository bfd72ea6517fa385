// ledger-core/src/chain.rs

use crate::{
    block::{Block, GENESIS_SEED},
    mempool::Mempool,
    pow::{Target, TargetScheme},
    transaction::Transaction,
    types::*,
    LedgerError, LedgerResult,
};
use ledger_crypto::{digest, Hash};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Read-only chain summary for external inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Number of blocks, genesis included
    pub height: u64,
    pub difficulty: Difficulty,
    pub target_scheme: TargetScheme,
    pub tip_index: BlockIndex,
    pub tip_hash: Hash,
    pub tip_parent_hash: Hash,
    pub tip_state_root: Hash,
    pub tip_timestamp: Timestamp,
    pub tip_nonce: Nonce,
    pub tip_tx_count: usize,
    pub pending_count: usize,
}

/// Problem found by [`Chain::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainViolation {
    /// First block is not a well-formed genesis block
    BadGenesis { reason: String },
    /// `parent_hash` does not point at the predecessor
    BrokenLink {
        index: BlockIndex,
        expected: Hash,
        found: Hash,
    },
    /// Predecessor already holds the largest index
    IndexOverflow { position: u64 },
    /// Index does not follow the predecessor's
    IndexGap {
        position: u64,
        expected: BlockIndex,
        found: BlockIndex,
    },
    /// Stored hash differs from the hash of the block's fields
    HashMismatch { index: BlockIndex },
    /// Hash does not satisfy the block's own difficulty
    TargetNotMet {
        index: BlockIndex,
        difficulty: Difficulty,
    },
}

impl fmt::Display for ChainViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainViolation::BadGenesis { reason } => write!(f, "bad genesis: {reason}"),
            ChainViolation::BrokenLink {
                index,
                expected,
                found,
            } => write!(
                f,
                "block {index}: parent hash {found} does not match predecessor {expected}"
            ),
            ChainViolation::IndexGap {
                position,
                expected,
                found,
            } => write!(f, "position {position}: expected index {expected}, found {found}"),
            ChainViolation::IndexOverflow { position } => {
                write!(f, "position {position}: predecessor index has no successor")
            }
            ChainViolation::HashMismatch { index } => {
                write!(f, "block {index}: stored hash does not match contents")
            }
            ChainViolation::TargetNotMet { index, difficulty } => {
                write!(f, "block {index}: hash misses difficulty {difficulty}")
            }
        }
    }
}

/// Committed blocks plus the pool of transactions waiting for the next one
#[derive(Debug)]
pub struct Chain {
    /// Never empty: `blocks[0]` is genesis
    blocks: Vec<Block>,
    difficulty: Difficulty,
    target_scheme: TargetScheme,
    mempool: Mempool,
}

impl Chain {
    /// Create a chain holding only the genesis block
    pub fn new(difficulty: Difficulty, target_scheme: TargetScheme) -> Self {
        Self {
            blocks: vec![Block::genesis(difficulty)],
            difficulty,
            target_scheme,
            mempool: Mempool::new(),
        }
    }

    /// Rebuild a chain from stored blocks.
    ///
    /// The blocks must pass [`Chain::validate`]; the mempool starts empty.
    pub fn from_blocks(
        blocks: Vec<Block>,
        difficulty: Difficulty,
        target_scheme: TargetScheme,
    ) -> LedgerResult<Self> {
        let chain = Self::from_blocks_unchecked(blocks, difficulty, target_scheme)?;

        let violations = chain.validate();
        if let Some(first) = violations.first() {
            return Err(LedgerError::CorruptChain(format!(
                "{} violation(s), first: {}",
                violations.len(),
                first
            )));
        }
        Ok(chain)
    }

    /// Rebuild without auditing; only non-emptiness is enforced
    pub(crate) fn from_blocks_unchecked(
        blocks: Vec<Block>,
        difficulty: Difficulty,
        target_scheme: TargetScheme,
    ) -> LedgerResult<Self> {
        if blocks.is_empty() {
            return Err(LedgerError::CorruptChain("no blocks".into()));
        }
        Ok(Self {
            blocks,
            difficulty,
            target_scheme,
            mempool: Mempool::new(),
        })
    }

    /// Get the most recent block
    pub fn tip(&self) -> &Block {
        // blocks is never empty
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn genesis_block(&self) -> &Block {
        &self.blocks[0]
    }

    /// Number of blocks, genesis included
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get_block(&self, index: BlockIndex) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn get_block_by_hash(&self, hash: &Hash) -> Option<&Block> {
        self.blocks.iter().find(|b| b.hash == *hash)
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn target_scheme(&self) -> TargetScheme {
        self.target_scheme
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// Queue a transaction for the next block
    pub fn submit(&mut self, tx: Transaction) -> LedgerResult<TxId> {
        self.mempool.append(tx)
    }

    /// Copy of pending transactions for a mining attempt
    pub fn pending_snapshot(&self) -> Vec<Transaction> {
        self.mempool.snapshot()
    }

    /// Append a block after checking that it extends the tip.
    ///
    /// Proof-of-work is not re-checked here.
    pub fn append(&mut self, block: Block) -> LedgerResult<()> {
        let tip = self.tip();

        match tip.next_index() {
            Some(expected) if block.index == expected => {}
            Some(expected) => {
                return Err(LedgerError::InvalidLink {
                    index: block.index,
                    reason: format!("expected index {expected}"),
                });
            }
            None => {
                return Err(LedgerError::InvalidLink {
                    index: block.index,
                    reason: format!("tip index {} has no successor", tip.index),
                });
            }
        }

        if block.parent_hash != tip.hash {
            return Err(LedgerError::InvalidLink {
                index: block.index,
                reason: format!("parent {} is not the tip {}", block.parent_hash, tip.hash),
            });
        }

        tracing::info!(
            index = block.index,
            hash = %block.hash,
            txs = block.tx_count(),
            "block appended"
        );
        self.blocks.push(block);
        Ok(())
    }

    /// Append a mined block and drain the ids it consumed, as one step.
    ///
    /// If the block is rejected the mempool is left untouched.
    pub fn commit(&mut self, block: Block, included: &HashSet<TxId>) -> LedgerResult<usize> {
        self.append(block)?;
        Ok(self.mempool.drain(included))
    }

    pub fn info(&self) -> ChainInfo {
        let tip = self.tip();
        ChainInfo {
            height: self.height(),
            difficulty: self.difficulty,
            target_scheme: self.target_scheme,
            tip_index: tip.index,
            tip_hash: tip.hash,
            tip_parent_hash: tip.parent_hash,
            tip_state_root: tip.state_root,
            tip_timestamp: tip.timestamp,
            tip_nonce: tip.nonce,
            tip_tx_count: tip.tx_count(),
            pending_count: self.mempool.len(),
        }
    }

    /// Walk the whole chain re-checking linkage, hashes and targets.
    ///
    /// Returns every violation found; an empty list means the chain is sound.
    pub fn validate(&self) -> Vec<ChainViolation> {
        let mut violations = Vec::new();

        let Some(genesis) = self.blocks.first() else {
            violations.push(ChainViolation::BadGenesis {
                reason: "chain is empty".into(),
            });
            return violations;
        };

        if !genesis.is_genesis() {
            violations.push(ChainViolation::BadGenesis {
                reason: format!(
                    "index {} with parent {}",
                    genesis.index, genesis.parent_hash
                ),
            });
        }
        if genesis.hash != digest(GENESIS_SEED) {
            violations.push(ChainViolation::BadGenesis {
                reason: format!("unexpected genesis hash {}", genesis.hash),
            });
        }

        for (position, pair) in self.blocks.windows(2).enumerate() {
            let (prev, block) = (&pair[0], &pair[1]);
            let position = position as u64 + 1;

            match prev.next_index() {
                Some(expected) if block.index != expected => {
                    violations.push(ChainViolation::IndexGap {
                        position,
                        expected,
                        found: block.index,
                    });
                }
                Some(_) => {}
                None => violations.push(ChainViolation::IndexOverflow { position }),
            }

            if block.parent_hash != prev.hash {
                violations.push(ChainViolation::BrokenLink {
                    index: block.index,
                    expected: prev.hash,
                    found: block.parent_hash,
                });
            }

            if !block.has_consistent_hash() {
                violations.push(ChainViolation::HashMismatch { index: block.index });
            }

            let target = Target::new(self.target_scheme, block.difficulty);
            if !target.is_met_by(&block.hash) {
                violations.push(ChainViolation::TargetNotMet {
                    index: block.index,
                    difficulty: block.difficulty,
                });
            }
        }

        violations
    }
}
