// ledger-core/src/lib.rs

//! Core ledger data structures and logic
//!
//! This crate provides:
//! - Transactions and the pending pool (mempool)
//! - Block structure, hashing and proof-of-work targets
//! - The chain with its linkage rules and audit walk
//! - The nonce search that turns pending transactions into blocks
//! - Whole-file JSON snapshots of a chain

pub mod block;
pub mod chain;
pub mod ledger;
pub mod mempool;
pub mod miner;
pub mod pow;
pub mod state;
pub mod store;
pub mod transaction;
pub mod types;

pub use block::Block;
pub use chain::{Chain, ChainInfo, ChainViolation};
pub use ledger::{Ledger, MiningTemplate};
pub use mempool::{Mempool, PoolMetrics};
pub use miner::{MineOutcome, Miner, MinerConfig};
pub use pow::{Target, TargetScheme};
pub use state::{FixedStateRoot, ProviderError, StateRootProvider};
pub use store::{ChainSnapshot, ChainStore};
pub use transaction::{Payload, Transaction, TxKind};
pub use types::*;

use ledger_crypto::Hash;

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur in ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid link at index {index}: {reason}")]
    InvalidLink { index: BlockIndex, reason: String },

    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("Transaction already pending: {0}")]
    DuplicateTransaction(Hash),

    #[error("State provider unavailable: {0}")]
    StateProvider(#[from] ProviderError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Corrupt chain: {0}")]
    CorruptChain(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Search worker panicked")]
    WorkerPanicked,

    #[error("Ledger lock poisoned")]
    LockPoisoned,

    #[error("Cryptographic error: {0}")]
    CryptoError(#[from] ledger_crypto::CryptoError),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::SerializationError(e.to_string())
    }
}
