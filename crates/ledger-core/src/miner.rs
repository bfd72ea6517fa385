// ledger-core/src/miner.rs

use crate::{
    block::Block,
    ledger::{Ledger, MiningTemplate},
    pow::Target,
    state::StateRootProvider,
    types::*,
    LedgerError, LedgerResult,
};
use ledger_crypto::Hash;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

/// Miner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Refuse to mine when nothing is pending
    pub require_pending: bool,
    /// Search threads; 0 means one per CPU
    pub workers: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            require_pending: true,
            workers: 1,
        }
    }
}

/// Result of one mining attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MineOutcome {
    /// A block was committed and its transactions drained
    Mined(Block),
    /// No nonce in the budget met the target; nothing changed
    Exhausted { attempts: u64 },
    /// Mempool was empty and empty blocks are disallowed
    NothingPending,
}

impl MineOutcome {
    pub fn is_mined(&self) -> bool {
        matches!(self, MineOutcome::Mined(_))
    }

    pub fn block(&self) -> Option<&Block> {
        match self {
            MineOutcome::Mined(block) => Some(block),
            _ => None,
        }
    }

    pub fn into_block(self) -> Option<Block> {
        match self {
            MineOutcome::Mined(block) => Some(block),
            _ => None,
        }
    }
}

/// Stateless proof-of-work search over a bounded nonce budget
#[derive(Debug, Clone, Default)]
pub struct Miner {
    config: MinerConfig,
}

impl Miner {
    pub fn new(config: MinerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    fn worker_count(&self) -> usize {
        match self.config.workers {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    /// Try once to extend the chain.
    ///
    /// Snapshots the pending transactions and tip, samples the state root
    /// once, then searches nonces `0..max_iters`. On a hit the block is
    /// committed and exactly the snapshotted ids are drained; transactions
    /// submitted during the search stay pending. A provider failure aborts
    /// with no block and no drain.
    pub fn mine_once(
        &self,
        ledger: &Ledger,
        provider: &dyn StateRootProvider,
        max_iters: u64,
        difficulty: Option<Difficulty>,
    ) -> LedgerResult<MineOutcome> {
        if max_iters == 0 {
            return Err(LedgerError::InvalidArgument(
                "max_iters must be positive".into(),
            ));
        }

        let template = ledger.template(difficulty)?;
        if template.transactions.is_empty() && self.config.require_pending {
            tracing::debug!("nothing pending, skipping search");
            return Ok(MineOutcome::NothingPending);
        }

        let state_root = provider.compute_state_root().map_err(|e| {
            tracing::warn!("state root unavailable, aborting search: {}", e);
            LedgerError::StateProvider(e)
        })?;

        tracing::debug!(
            parent = template.parent.index,
            txs = template.transactions.len(),
            difficulty = template.difficulty,
            scheme = %template.target_scheme,
            max_iters,
            "starting nonce search"
        );

        let (found, attempts) = self.search(&template, state_root, max_iters, current_timestamp())?;

        let Some(block) = found else {
            tracing::warn!(
                attempts,
                difficulty = template.difficulty,
                "nonce budget exhausted without a block"
            );
            return Ok(MineOutcome::Exhausted { attempts });
        };

        let included: HashSet<TxId> = block.tx_ids.iter().copied().collect();
        ledger.commit(block.clone(), &included)?;

        tracing::info!(
            index = block.index,
            nonce = block.nonce,
            attempts,
            hash = %block.hash,
            "block mined"
        );
        Ok(MineOutcome::Mined(block))
    }

    /// Search without touching the ledger.
    ///
    /// Every candidate shares `(parent, state_root, tx_ids, difficulty,
    /// timestamp)`; only the nonce varies. Returns the winning block, if
    /// any, and the number of candidates hashed.
    pub fn search(
        &self,
        template: &MiningTemplate,
        state_root: Hash,
        max_iters: u64,
        timestamp: Timestamp,
    ) -> LedgerResult<(Option<Block>, u64)> {
        let target = Target::new(template.target_scheme, template.difficulty);
        if max_iters == 0 || target == Target::Unreachable {
            return Ok((None, 0));
        }

        let tx_ids = template.tx_ids();
        let workers = (self.worker_count() as u64).clamp(1, max_iters);

        if workers == 1 {
            let mut attempts = 0;
            for nonce in 0..max_iters {
                attempts += 1;
                let candidate = Block::candidate(
                    &template.parent,
                    state_root,
                    tx_ids.clone(),
                    template.difficulty,
                    nonce,
                    timestamp,
                )?;
                if target.is_met_by(&candidate.hash) {
                    return Ok((Some(candidate), attempts));
                }
            }
            return Ok((None, attempts));
        }

        let found = AtomicBool::new(false);
        let attempts = AtomicU64::new(0);

        let results: Vec<LedgerResult<Option<Block>>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let (found, attempts, target, tx_ids) = (&found, &attempts, &target, &tx_ids);
                    scope.spawn(move || -> LedgerResult<Option<Block>> {
                        let mut nonce = worker;
                        while nonce < max_iters && !found.load(Ordering::Relaxed) {
                            attempts.fetch_add(1, Ordering::Relaxed);
                            let candidate = Block::candidate(
                                &template.parent,
                                state_root,
                                tx_ids.clone(),
                                template.difficulty,
                                nonce,
                                timestamp,
                            )?;
                            if target.is_met_by(&candidate.hash) {
                                // first hit wins; later hits are discarded
                                if found
                                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                                    .is_ok()
                                {
                                    return Ok(Some(candidate));
                                }
                                return Ok(None);
                            }
                            nonce += workers;
                        }
                        Ok(None)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or(Err(LedgerError::WorkerPanicked))
                })
                .collect()
        });

        let mut winner = None;
        for result in results {
            if let Some(block) = result? {
                winner = Some(block);
            }
        }
        Ok((winner, attempts.load(Ordering::Relaxed)))
    }
}
