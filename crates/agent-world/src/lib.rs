// agent-world/src/lib.rs

//! In-memory world of agents that the ledger anchors
//!
//! This crate provides:
//! - Fractal signature descriptors derived from text
//! - The agent graph (nodes, lineage edges, layout)
//! - Kernel operations: ingest, merge, clear, export, import
//! - The state root the miner binds into each block

pub mod fractal;
pub mod graph;
pub mod world;

pub use fractal::{EncodedText, FractalSignature};
pub use graph::{AgentGraph, AgentNode, Edge, NodeSpec, Position};
pub use world::{ImportPayload, SharedWorld, StateMeta, World, WorldState};

/// Result type for world operations
pub type WorldResult<T> = Result<T, WorldError>;

/// Errors that can occur in world operations
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("Bad descriptor: {0}")]
    BadDescriptor(String),

    #[error("Bad import: {0}")]
    BadImport(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cryptographic error: {0}")]
    CryptoError(#[from] ledger_crypto::CryptoError),

    #[error("World lock poisoned")]
    LockPoisoned,
}
