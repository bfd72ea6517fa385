// ledger-core/src/ledger.rs

use crate::{
    block::Block,
    chain::{Chain, ChainInfo, ChainViolation},
    pow::TargetScheme,
    store::ChainStore,
    transaction::{Transaction, TxKind},
    types::*,
    LedgerError, LedgerResult,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Fixed inputs of one mining attempt, captured under a single read lock
#[derive(Debug, Clone)]
pub struct MiningTemplate {
    pub parent: Block,
    pub transactions: Vec<Transaction>,
    pub difficulty: Difficulty,
    pub target_scheme: TargetScheme,
}

impl MiningTemplate {
    pub fn tx_ids(&self) -> Vec<TxId> {
        self.transactions.iter().map(|tx| tx.id).collect()
    }
}

/// Thread-safe handle around a [`Chain`].
///
/// Locks are held only for snapshots and commits, so transactions can be
/// submitted while a nonce search is running. When a store is attached the
/// chain file is rewritten after every commit.
#[derive(Debug)]
pub struct Ledger {
    chain: RwLock<Chain>,
    store: Option<ChainStore>,
}

impl Ledger {
    /// In-memory ledger
    pub fn new(chain: Chain) -> Self {
        Self {
            chain: RwLock::new(chain),
            store: None,
        }
    }

    /// Load the chain from `store` (or create genesis) and keep it attached
    pub fn open(
        store: ChainStore,
        difficulty: Difficulty,
        target_scheme: TargetScheme,
    ) -> LedgerResult<Self> {
        let chain = store.load_or_genesis(difficulty, target_scheme)?;
        Ok(Self {
            chain: RwLock::new(chain),
            store: Some(store),
        })
    }

    pub fn store(&self) -> Option<&ChainStore> {
        self.store.as_ref()
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, Chain>> {
        self.chain.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Chain>> {
        self.chain.write().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Build and queue a transaction
    pub fn submit<P: Serialize + ?Sized>(&self, kind: TxKind, payload: &P) -> LedgerResult<TxId> {
        let tx = Transaction::new(kind, payload)?;
        self.submit_tx(tx)
    }

    pub fn submit_tx(&self, tx: Transaction) -> LedgerResult<TxId> {
        self.write()?.submit(tx)
    }

    pub fn pending(&self) -> LedgerResult<Vec<Transaction>> {
        Ok(self.read()?.pending_snapshot())
    }

    pub fn tip(&self) -> LedgerResult<Block> {
        Ok(self.read()?.tip().clone())
    }

    pub fn info(&self) -> LedgerResult<ChainInfo> {
        Ok(self.read()?.info())
    }

    pub fn blocks(&self) -> LedgerResult<Vec<Block>> {
        Ok(self.read()?.blocks().to_vec())
    }

    pub fn validate(&self) -> LedgerResult<Vec<ChainViolation>> {
        Ok(self.read()?.validate())
    }

    /// Run `f` against the chain under a read lock
    pub fn with_chain<R>(&self, f: impl FnOnce(&Chain) -> R) -> LedgerResult<R> {
        let chain = self.read()?;
        Ok(f(&chain))
    }

    /// Capture the tip, pending transactions and difficulty in one read.
    ///
    /// `difficulty` falls back to the chain's current difficulty.
    pub fn template(&self, difficulty: Option<Difficulty>) -> LedgerResult<MiningTemplate> {
        let chain = self.read()?;
        Ok(MiningTemplate {
            parent: chain.tip().clone(),
            transactions: chain.pending_snapshot(),
            difficulty: difficulty.unwrap_or_else(|| chain.difficulty()),
            target_scheme: chain.target_scheme(),
        })
    }

    /// Append a mined block and drain its transactions in one write.
    ///
    /// A failed snapshot write is logged and does not undo the commit.
    pub fn commit(&self, block: Block, included: &HashSet<TxId>) -> LedgerResult<usize> {
        let mut chain = self.write()?;
        let drained = chain.commit(block, included)?;

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&chain) {
                tracing::error!(
                    path = %store.path().display(),
                    "chain committed in memory but snapshot failed: {}",
                    e
                );
            }
        }

        Ok(drained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_template_uses_chain_difficulty_by_default() {
        let ledger = Ledger::new(Chain::new(3, TargetScheme::LeadingZeroHex));
        ledger.submit(TxKind::Add, &json!({"text": "sun"})).unwrap();

        let template = ledger.template(None).unwrap();
        assert_eq!(template.difficulty, 3);
        assert_eq!(template.transactions.len(), 1);
        assert!(template.parent.is_genesis());

        assert_eq!(ledger.template(Some(1)).unwrap().difficulty, 1);
    }

    #[test]
    fn test_concurrent_submit() {
        let ledger = Arc::new(Ledger::new(Chain::new(1, TargetScheme::LeadingZeroHex)));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    ledger
                        .submit(TxKind::Add, &json!({"text": format!("agent-{i}")}))
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.info().unwrap().pending_count, 8);
    }

    #[test]
    fn test_with_chain_reads_tip() {
        let ledger = Ledger::new(Chain::new(2, TargetScheme::LeadingZeroHex));
        let (height, genesis) = ledger
            .with_chain(|chain| (chain.height(), chain.tip().is_genesis()))
            .unwrap();
        assert_eq!(height, 1);
        assert!(genesis);
    }

    #[test]
    fn test_malformed_submit_leaves_pool() {
        let ledger = Ledger::new(Chain::new(1, TargetScheme::LeadingZeroHex));
        assert!(ledger.submit(TxKind::Add, &json!(42)).is_err());
        assert!(ledger.pending().unwrap().is_empty());
    }
}
