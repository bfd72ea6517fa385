// ledger-core/src/types.rs

use ledger_crypto::Hash;

/// Block position in the chain (0 = genesis)
pub type BlockIndex = u64;

/// Proof-of-work nonce
pub type Nonce = u64;

/// Difficulty as interpreted by the chain's [`crate::TargetScheme`]
pub type Difficulty = u32;

/// Timestamp in Unix epoch microseconds
pub type Timestamp = u64;

/// Transaction identifier
pub type TxId = Hash;

/// Current wall-clock time in microseconds.
///
/// Clocks set before the epoch read as 0.
pub fn current_timestamp() -> Timestamp {
    let micros = chrono::Utc::now().timestamp_micros();
    u64::try_from(micros).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_monotone_enough() {
        let a = current_timestamp();
        let b = current_timestamp();
        assert!(a > 0);
        assert!(b >= a);
    }
}
