// ledger-core/src/store.rs

use crate::{
    block::Block,
    chain::{Chain, ChainInfo, ChainViolation},
    pow::TargetScheme,
    types::Difficulty,
    LedgerError, LedgerResult,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk document: one per chain, rewritten wholesale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub difficulty: Difficulty,
    #[serde(default)]
    pub target_scheme: TargetScheme,
    pub blocks: Vec<Block>,
}

impl ChainSnapshot {
    pub fn from_chain(chain: &Chain) -> Self {
        Self {
            difficulty: chain.difficulty(),
            target_scheme: chain.target_scheme(),
            blocks: chain.blocks().to_vec(),
        }
    }

    pub fn into_chain(self) -> LedgerResult<Chain> {
        Chain::from_blocks(self.blocks, self.difficulty, self.target_scheme)
    }

    /// Every violation in the stored blocks, without rejecting the snapshot
    pub fn audit(&self) -> LedgerResult<Vec<ChainViolation>> {
        let chain =
            Chain::from_blocks_unchecked(self.blocks.clone(), self.difficulty, self.target_scheme)?;
        Ok(chain.validate())
    }

    /// Summary of the stored blocks; nothing is pending in a stored chain
    pub fn info(&self) -> LedgerResult<ChainInfo> {
        let chain =
            Chain::from_blocks_unchecked(self.blocks.clone(), self.difficulty, self.target_scheme)?;
        Ok(chain.info())
    }
}

/// JSON file holding a [`ChainSnapshot`].
///
/// There is no write-ahead log: a crash between an in-memory commit and the
/// rewrite loses the newest block.
#[derive(Debug, Clone)]
pub struct ChainStore {
    path: PathBuf,
}

impl ChainStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored document as-is
    pub fn read_snapshot(&self) -> LedgerResult<ChainSnapshot> {
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Read and validate the stored chain
    pub fn load(&self) -> LedgerResult<Chain> {
        self.read_snapshot()?.into_chain()
    }

    /// Load the stored chain, or start from genesis.
    ///
    /// A missing file gets a fresh genesis written to it. An unreadable or
    /// invalid file is moved aside to `<name>.corrupt` before starting over.
    pub fn load_or_genesis(
        &self,
        difficulty: Difficulty,
        target_scheme: TargetScheme,
    ) -> LedgerResult<Chain> {
        if !self.path.is_file() {
            tracing::info!(path = %self.path.display(), "no chain file, creating genesis");
            let chain = Chain::new(difficulty, target_scheme);
            self.save(&chain)?;
            return Ok(chain);
        }

        match self.load() {
            Ok(chain) => {
                tracing::info!(
                    path = %self.path.display(),
                    height = chain.height(),
                    "chain loaded"
                );
                Ok(chain)
            }
            Err(e) => {
                let aside = self.corrupt_path();
                tracing::warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    "chain file unusable ({}), starting from genesis",
                    e
                );
                fs::rename(&self.path, &aside)?;
                let chain = Chain::new(difficulty, target_scheme);
                self.save(&chain)?;
                Ok(chain)
            }
        }
    }

    /// Rewrite the whole file from the chain's blocks
    pub fn save(&self, chain: &Chain) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let snapshot = ChainSnapshot::from_chain(chain);
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&self.path, json).map_err(|e| {
            LedgerError::Storage(format!("writing {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(path = %self.path.display(), height = chain.height(), "chain saved");
        Ok(())
    }

    fn corrupt_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".corrupt");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::Target;
    use ledger_crypto::digest;
    use tempfile::TempDir;

    fn extend(chain: &mut Chain) {
        let target = Target::new(chain.target_scheme(), chain.difficulty());
        let block = (0..)
            .map(|nonce| {
                Block::candidate(chain.tip(), digest(b"root"), vec![], chain.difficulty(), nonce, 7)
                    .unwrap()
            })
            .find(|b| target.is_met_by(&b.hash))
            .unwrap();
        chain.append(block).unwrap();
    }

    #[test]
    fn test_missing_file_creates_genesis() {
        let dir = TempDir::new().unwrap();
        let store = ChainStore::new(dir.path().join("chain_state.json"));

        let chain = store.load_or_genesis(2, TargetScheme::LeadingZeroHex).unwrap();
        assert_eq!(chain.height(), 1);
        assert!(store.path().is_file());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let store = ChainStore::new(dir.path().join("nested").join("chain_state.json"));

        let mut chain = Chain::new(1, TargetScheme::LeadingZeroBits);
        extend(&mut chain);
        extend(&mut chain);
        store.save(&chain).unwrap();

        let loaded = store.load_or_genesis(9, TargetScheme::LeadingZeroHex).unwrap();
        assert_eq!(loaded.blocks(), chain.blocks());
        assert_eq!(loaded.difficulty(), 1);
        assert_eq!(loaded.target_scheme(), TargetScheme::LeadingZeroBits);
        assert!(loaded.mempool().is_empty());
    }

    #[test]
    fn test_document_layout() {
        let dir = TempDir::new().unwrap();
        let store = ChainStore::new(dir.path().join("chain.json"));
        store.save(&Chain::new(4, TargetScheme::LeadingZeroHex)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["difficulty"], 4);
        assert_eq!(raw["target_scheme"], "leading_zero_hex");
        assert_eq!(raw["blocks"].as_array().unwrap().len(), 1);
        assert_eq!(raw["blocks"][0]["hash"], digest("genesis").to_hex());
    }

    #[test]
    fn test_corrupt_file_moved_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain_state.json");
        fs::write(&path, "{ not json").unwrap();
        let store = ChainStore::new(&path);

        let chain = store.load_or_genesis(2, TargetScheme::LeadingZeroHex).unwrap();
        assert_eq!(chain.height(), 1);
        assert!(dir.path().join("chain_state.json.corrupt").is_file());
        assert!(store.load().is_ok());
    }

    #[test]
    fn test_snapshot_info_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let store = ChainStore::new(dir.path().join("chain_state.json"));
        assert!(store.read_snapshot().is_err());
        assert!(!store.path().exists());

        let mut chain = Chain::new(0, TargetScheme::LeadingZeroHex);
        extend(&mut chain);
        let mut snapshot = ChainSnapshot::from_chain(&chain);
        snapshot.blocks[1].parent_hash = digest(b"forged");
        fs::write(store.path(), serde_json::to_string(&snapshot).unwrap()).unwrap();

        let info = store.read_snapshot().unwrap().info().unwrap();
        assert_eq!(info.height, 2);
        assert_eq!(info.pending_count, 0);
        assert!(!dir.path().join("chain_state.json.corrupt").exists());
    }

    #[test]
    fn test_broken_linkage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = ChainStore::new(dir.path().join("chain.json"));

        let mut chain = Chain::new(0, TargetScheme::LeadingZeroHex);
        extend(&mut chain);
        let mut snapshot = ChainSnapshot::from_chain(&chain);
        snapshot.blocks[1].parent_hash = digest(b"forged");
        fs::write(store.path(), serde_json::to_string(&snapshot).unwrap()).unwrap();

        assert!(matches!(store.load(), Err(LedgerError::CorruptChain(_))));

        let violations = store.read_snapshot().unwrap().audit().unwrap();
        assert!(matches!(
            violations.as_slice(),
            [ChainViolation::BrokenLink { index: 1, .. }, ..]
        ));
    }

    #[test]
    fn test_max_index_chain_moved_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain_state.json");
        let store = ChainStore::new(&path);

        let genesis = Block::genesis(0);
        let mut top = Block::candidate(&genesis, digest(b"root"), vec![], 0, 0, 1).unwrap();
        top.index = u64::MAX;
        top.hash = top.compute_hash().unwrap();
        let mut wrapped = top.clone();
        wrapped.index = 0;
        wrapped.parent_hash = top.hash;
        wrapped.hash = wrapped.compute_hash().unwrap();

        let snapshot = ChainSnapshot {
            difficulty: 0,
            target_scheme: TargetScheme::LeadingZeroHex,
            blocks: vec![genesis, top, wrapped],
        };
        fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();

        let violations = store.read_snapshot().unwrap().audit().unwrap();
        assert!(violations.contains(&ChainViolation::IndexOverflow { position: 2 }));

        let chain = store.load_or_genesis(0, TargetScheme::LeadingZeroHex).unwrap();
        assert_eq!(chain.height(), 1);
        assert!(dir.path().join("chain_state.json.corrupt").is_file());
    }
}
