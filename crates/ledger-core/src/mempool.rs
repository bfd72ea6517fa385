// ledger-core/src/mempool.rs

use crate::{transaction::Transaction, LedgerError, LedgerResult, TxId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Pool counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMetrics {
    pub pending_count: usize,
    pub total_added: u64,
    pub total_drained: u64,
}

/// Pending transactions awaiting inclusion, in submission order
#[derive(Debug, Default)]
pub struct Mempool {
    pending: Vec<Transaction>,
    /// Ids currently pending
    ids: HashSet<TxId>,
    metrics: PoolMetrics,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction to the pool.
    ///
    /// The id is recomputed from content and must match; an id that is
    /// already pending is rejected. On error the pool is unchanged.
    pub fn append(&mut self, tx: Transaction) -> LedgerResult<TxId> {
        tx.validate_id()?;

        let id = tx.id;
        if self.ids.contains(&id) {
            return Err(LedgerError::DuplicateTransaction(id));
        }

        self.ids.insert(id);
        self.pending.push(tx);
        self.metrics.total_added += 1;
        self.metrics.pending_count = self.pending.len();

        tracing::debug!(tx = %id, pending = self.pending.len(), "transaction appended");
        Ok(id)
    }

    /// Copy of the current pending sequence
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.pending.clone()
    }

    /// Remove exactly the given ids. Ids not in the pool are ignored.
    ///
    /// Returns how many transactions were removed.
    pub fn drain(&mut self, included: &HashSet<TxId>) -> usize {
        let before = self.pending.len();
        self.pending.retain(|tx| !included.contains(&tx.id));
        let removed = before - self.pending.len();

        for id in included {
            self.ids.remove(id);
        }
        self.metrics.total_drained += removed as u64;
        self.metrics.pending_count = self.pending.len();

        tracing::debug!(removed, remaining = self.pending.len(), "mempool drained");
        removed
    }

    /// Get transaction by id
    pub fn get(&self, id: &TxId) -> Option<&Transaction> {
        if !self.ids.contains(id) {
            return None;
        }
        self.pending.iter().find(|tx| tx.id == *id)
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Get pool metrics
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}
