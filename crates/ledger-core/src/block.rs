// ledger-core/src/block.rs
use crate::{types::*, LedgerError, LedgerResult};
use ledger_crypto::{canonical, digest, Hash};
use serde::{Deserialize, Serialize};

/// Seed for the fixed genesis hash and state root
pub const GENESIS_SEED: &str = "genesis";

/// Committed block. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, 0 for genesis
    pub index: BlockIndex,
    pub timestamp: Timestamp,
    /// Hash of previous block
    pub parent_hash: Hash,
    /// Digest of the world state the block was mined against
    pub state_root: Hash,
    /// Ids of the included transactions, in mempool order
    pub tx_ids: Vec<TxId>,
    pub difficulty: Difficulty,
    pub nonce: Nonce,
    pub hash: Hash,
}

/// Every field except `hash`, in the form that gets hashed
#[derive(Serialize)]
struct BlockPreimage<'a> {
    index: BlockIndex,
    timestamp: Timestamp,
    parent_hash: &'a Hash,
    state_root: &'a Hash,
    tx_ids: &'a [TxId],
    difficulty: Difficulty,
    nonce: Nonce,
}

impl Block {
    /// Build a candidate on top of `parent` and compute its hash.
    ///
    /// Pure: the same inputs always give the same block.
    pub fn candidate(
        parent: &Block,
        state_root: Hash,
        tx_ids: Vec<TxId>,
        difficulty: Difficulty,
        nonce: Nonce,
        timestamp: Timestamp,
    ) -> LedgerResult<Self> {
        let index = parent.next_index().ok_or_else(|| LedgerError::InvalidLink {
            index: parent.index,
            reason: "parent index has no successor".into(),
        })?;
        let mut block = Self {
            index,
            timestamp,
            parent_hash: parent.hash,
            state_root,
            tx_ids,
            difficulty,
            nonce,
            hash: Hash::zero(),
        };
        block.hash = block.compute_hash()?;
        Ok(block)
    }

    /// Hash of the canonical encoding of every field but `hash`
    pub fn compute_hash(&self) -> LedgerResult<Hash> {
        let preimage = BlockPreimage {
            index: self.index,
            timestamp: self.timestamp,
            parent_hash: &self.parent_hash,
            state_root: &self.state_root,
            tx_ids: &self.tx_ids,
            difficulty: self.difficulty,
            nonce: self.nonce,
        };
        let bytes = canonical(&preimage).map_err(LedgerError::from)?;
        Ok(digest(bytes))
    }

    /// Whether the stored hash matches the other fields
    pub fn has_consistent_hash(&self) -> bool {
        matches!(self.compute_hash(), Ok(hash) if hash == self.hash)
    }

    /// Create genesis block.
    ///
    /// Genesis carries a fixed hash rather than a computed one and is exempt
    /// from proof-of-work.
    pub fn genesis(difficulty: Difficulty) -> Self {
        Self {
            index: 0,
            timestamp: 0,
            parent_hash: Hash::zero(),
            state_root: digest(GENESIS_SEED),
            tx_ids: Vec::new(),
            difficulty,
            nonce: 0,
            hash: digest(GENESIS_SEED),
        }
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.parent_hash.is_zero()
    }

    pub fn tx_count(&self) -> usize {
        self.tx_ids.len()
    }

    /// Index of the block that would follow this one
    pub fn next_index(&self) -> Option<BlockIndex> {
        self.index.checked_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis(4);
        assert_eq!(genesis.index, 0);
        assert!(genesis.is_genesis());
        assert_eq!(genesis.tx_count(), 0);
        assert_eq!(genesis.hash, digest("genesis"));
        assert_eq!(Block::genesis(4), Block::genesis(4));
    }

    #[test]
    fn test_candidate_links_to_parent() {
        let genesis = Block::genesis(2);
        let ids = vec![digest(b"tx1"), digest(b"tx2")];
        let block = Block::candidate(&genesis, digest(b"root"), ids.clone(), 2, 7, 1_000).unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.parent_hash, genesis.hash);
        assert_eq!(block.tx_ids, ids);
        assert!(!block.is_genesis());
        assert!(block.has_consistent_hash());
    }

    #[test]
    fn test_candidate_refuses_max_index_parent() {
        let parent = Block {
            index: BlockIndex::MAX,
            ..Block::genesis(1)
        };
        assert!(parent.next_index().is_none());
        let err = Block::candidate(&parent, digest(b"root"), vec![], 1, 0, 1).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLink { .. }));
    }

    #[test]
    fn test_candidate_is_deterministic() {
        let genesis = Block::genesis(2);
        let a = Block::candidate(&genesis, digest(b"root"), vec![], 2, 3, 99).unwrap();
        let b = Block::candidate(&genesis, digest(b"root"), vec![], 2, 3, 99).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_field_feeds_the_hash() {
        let genesis = Block::genesis(2);
        let base = Block::candidate(&genesis, digest(b"root"), vec![digest(b"t")], 2, 3, 99).unwrap();

        let variants = [
            Block { index: 5, ..base.clone() },
            Block { timestamp: 100, ..base.clone() },
            Block { parent_hash: digest(b"other"), ..base.clone() },
            Block { state_root: digest(b"other"), ..base.clone() },
            Block { tx_ids: vec![], ..base.clone() },
            Block { difficulty: 3, ..base.clone() },
            Block { nonce: 4, ..base.clone() },
        ];
        for variant in variants {
            assert_ne!(variant.compute_hash().unwrap(), base.hash);
            assert!(!variant.has_consistent_hash());
        }
    }

    #[test]
    fn test_preimage_is_canonical_json() {
        let genesis = Block::genesis(1);
        let block = Block::candidate(&genesis, Hash::zero(), vec![], 1, 0, 0).unwrap();
        let expected = format!(
            r#"{{"difficulty":1,"index":1,"nonce":0,"parent_hash":"{}","state_root":"{}","timestamp":0,"tx_ids":[]}}"#,
            genesis.hash,
            Hash::zero()
        );
        assert_eq!(block.hash, digest(expected));
    }

    #[test]
    fn test_block_json_roundtrip_keeps_hash_valid() {
        let genesis = Block::genesis(2);
        let block = Block::candidate(&genesis, digest(b"r"), vec![digest(b"t")], 2, 11, 123).unwrap();
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
        assert!(back.has_consistent_hash());
    }
}
