// ledger-crypto/src/lib.rs

//! Hashing primitives for the anchor ledger
//!
//! This crate provides:
//! - SHA-256 digests rendered as 64-char hex
//! - Canonical (sorted-key, whitespace-free) JSON serialization
//! - The order-independent merkle-like root reduction

pub mod hash;
pub mod merkle;

pub use hash::{canonical, digest, Hash, Hashable, HASH_SIZE};
pub use merkle::merkle_like_root;

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during hashing and encoding
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_basics() {
        let root = merkle_like_root(&[digest(b"a"), digest(b"b")]);
        assert_eq!(root.to_hex().len(), 64);
    }
}
