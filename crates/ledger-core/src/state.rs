// ledger-core/src/state.rs

use ledger_crypto::Hash;
use std::sync::Arc;

/// Failure reported by a world-state provider
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Source of the digest that binds a block to external world state.
///
/// Must be deterministic for unchanged state. The miner calls it once per
/// search.
pub trait StateRootProvider: Send + Sync {
    fn compute_state_root(&self) -> Result<Hash, ProviderError>;
}

impl<T: StateRootProvider + ?Sized> StateRootProvider for &T {
    fn compute_state_root(&self) -> Result<Hash, ProviderError> {
        (**self).compute_state_root()
    }
}

impl<T: StateRootProvider + ?Sized> StateRootProvider for Arc<T> {
    fn compute_state_root(&self) -> Result<Hash, ProviderError> {
        (**self).compute_state_root()
    }
}

/// Provider that always reports the same root
#[derive(Debug, Clone, Copy)]
pub struct FixedStateRoot(pub Hash);

impl StateRootProvider for FixedStateRoot {
    fn compute_state_root(&self) -> Result<Hash, ProviderError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_crypto::digest;

    #[test]
    fn test_fixed_root_through_indirection() {
        let root = digest(b"world");
        let provider = Arc::new(FixedStateRoot(root));
        let as_dyn: &dyn StateRootProvider = &provider;
        assert_eq!(as_dyn.compute_state_root().unwrap(), root);
        assert_eq!((&provider).compute_state_root().unwrap(), root);
    }
}
