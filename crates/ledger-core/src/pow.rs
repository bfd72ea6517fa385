// ledger-core/src/pow.rs

use crate::Difficulty;
use ledger_crypto::{Hash, HASH_SIZE};
use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};
use std::fmt;

const HASH_BITS: u32 = (HASH_SIZE * 8) as u32;
const HASH_NIBBLES: u32 = (HASH_SIZE * 2) as u32;

/// How a difficulty integer maps to a hash target.
///
/// A chain picks one scheme at creation and keeps it; the same nominal
/// difficulty costs 16^d attempts under `LeadingZeroHex` but only 2^d under
/// `LeadingZeroBits`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetScheme {
    /// Hex form of the hash starts with `difficulty` zero characters
    #[default]
    LeadingZeroHex,
    /// Hash as a big-endian integer is `<= 2^(256 - difficulty) - 1`
    LeadingZeroBits,
}

impl TargetScheme {
    /// Largest difficulty that any hash can still satisfy
    pub fn max_difficulty(&self) -> Difficulty {
        match self {
            TargetScheme::LeadingZeroHex => HASH_NIBBLES,
            TargetScheme::LeadingZeroBits => HASH_BITS,
        }
    }
}

impl fmt::Display for TargetScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetScheme::LeadingZeroHex => f.write_str("leading_zero_hex"),
            TargetScheme::LeadingZeroBits => f.write_str("leading_zero_bits"),
        }
    }
}

/// Resolved target for one `(scheme, difficulty)` pair.
///
/// Build once per search and reuse for every nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    HexPrefix(u32),
    Threshold(BigUint),
    /// Difficulty beyond the hash width
    Unreachable,
}

impl Target {
    pub fn new(scheme: TargetScheme, difficulty: Difficulty) -> Self {
        if difficulty > scheme.max_difficulty() {
            return Target::Unreachable;
        }
        match scheme {
            TargetScheme::LeadingZeroHex => Target::HexPrefix(difficulty),
            TargetScheme::LeadingZeroBits => {
                let threshold = (BigUint::one() << (HASH_BITS - difficulty) as usize) - 1u32;
                Target::Threshold(threshold)
            }
        }
    }

    pub fn is_met_by(&self, hash: &Hash) -> bool {
        match self {
            Target::HexPrefix(zeros) => hash.leading_zero_nibbles() >= *zeros,
            Target::Threshold(threshold) => BigUint::from_bytes_be(hash.as_bytes()) <= *threshold,
            Target::Unreachable => false,
        }
    }
}

/// One-shot check of a hash against a difficulty
pub fn meets_target(hash: &Hash, difficulty: Difficulty, scheme: TargetScheme) -> bool {
    Target::new(scheme, difficulty).is_met_by(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_with_prefix(prefix: &[u8]) -> Hash {
        let mut bytes = [0xffu8; HASH_SIZE];
        bytes[..prefix.len()].copy_from_slice(prefix);
        Hash::new(bytes)
    }

    #[test]
    fn test_hex_prefix() {
        let hash = hash_with_prefix(&[0x00, 0x1f]);
        assert!(meets_target(&hash, 0, TargetScheme::LeadingZeroHex));
        assert!(meets_target(&hash, 2, TargetScheme::LeadingZeroHex));
        assert!(meets_target(&hash, 3, TargetScheme::LeadingZeroHex));
        assert!(!meets_target(&hash, 4, TargetScheme::LeadingZeroHex));
    }

    #[test]
    fn test_bit_threshold() {
        // 0x1f.. has 3 leading zero bits
        let hash = hash_with_prefix(&[0x1f]);
        assert!(meets_target(&hash, 3, TargetScheme::LeadingZeroBits));
        assert!(!meets_target(&hash, 4, TargetScheme::LeadingZeroBits));
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        // 2^(256-8) - 1 is 0x00ff..ff
        let at_target = hash_with_prefix(&[0x00]);
        assert!(meets_target(&at_target, 8, TargetScheme::LeadingZeroBits));
        let above = hash_with_prefix(&[0x01, 0x00]);
        assert!(!meets_target(&above, 8, TargetScheme::LeadingZeroBits));
    }

    #[test]
    fn test_zero_difficulty_accepts_everything() {
        let hash = hash_with_prefix(&[0xff]);
        assert!(meets_target(&hash, 0, TargetScheme::LeadingZeroBits));
        assert!(meets_target(&hash, 0, TargetScheme::LeadingZeroHex));
    }

    #[test]
    fn test_unreachable_difficulty() {
        assert_eq!(Target::new(TargetScheme::LeadingZeroHex, 65), Target::Unreachable);
        assert_eq!(Target::new(TargetScheme::LeadingZeroBits, 257), Target::Unreachable);
        assert!(!Target::Unreachable.is_met_by(&Hash::zero()));
        assert!(meets_target(&Hash::zero(), 256, TargetScheme::LeadingZeroBits));
        assert!(meets_target(&Hash::zero(), 64, TargetScheme::LeadingZeroHex));
    }

    #[test]
    fn test_scheme_wire_format() {
        let json = serde_json::to_string(&TargetScheme::LeadingZeroBits).unwrap();
        assert_eq!(json, "\"leading_zero_bits\"");
        assert_eq!(TargetScheme::default(), TargetScheme::LeadingZeroHex);
    }
}
