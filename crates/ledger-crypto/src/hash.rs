// ledger-crypto/src/hash.rs

use crate::{CryptoError, CryptoResult};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Hash output size in bytes
pub const HASH_SIZE: usize = 32;

/// A 32-byte SHA-256 digest.
///
/// Ordering is byte-wise, which matches lexicographic ordering of the
/// lowercase hex form. Serialized as a 64-char hex string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a new hash from bytes
    pub fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create a hash from a slice (returns error if wrong length)
    pub fn from_slice(slice: &[u8]) -> CryptoResult<Self> {
        if slice.len() != HASH_SIZE {
            return Err(CryptoError::InvalidHash(format!(
                "expected {} bytes, got {}",
                HASH_SIZE,
                slice.len()
            )));
        }
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the hash as a fixed-size array
    pub fn to_bytes(&self) -> [u8; HASH_SIZE] {
        self.0
    }

    /// All-zero hash, used as the genesis parent link
    pub fn zero() -> Self {
        Self([0u8; HASH_SIZE])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_SIZE]
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHash(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Number of leading `0` characters in the hex form
    pub fn leading_zero_nibbles(&self) -> u32 {
        let mut count = 0;
        for byte in self.0 {
            if byte == 0 {
                count += 2;
                continue;
            }
            if byte >> 4 == 0 {
                count += 1;
            }
            break;
        }
        count
    }

    /// Number of leading zero bits when read as a big-endian integer
    pub fn leading_zero_bits(&self) -> u32 {
        let mut count = 0;
        for byte in self.0 {
            if byte == 0 {
                count += 8;
                continue;
            }
            count += byte.leading_zeros();
            break;
        }
        count
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hash({}...{})",
            hex::encode(&self.0[..4]),
            hex::encode(&self.0[28..])
        )
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Hash {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(de::Error::custom)
    }
}

/// SHA-256 of raw bytes
pub fn digest(data: impl AsRef<[u8]>) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    Hash::new(hasher.finalize().into())
}

/// Trait for types that can be hashed
pub trait Hashable {
    fn hash(&self) -> Hash;
}

impl Hashable for [u8] {
    fn hash(&self) -> Hash {
        digest(self)
    }
}

impl Hashable for Vec<u8> {
    fn hash(&self) -> Hash {
        digest(self)
    }
}

impl Hashable for &str {
    fn hash(&self) -> Hash {
        digest(self.as_bytes())
    }
}

impl Hashable for String {
    fn hash(&self) -> Hash {
        digest(self.as_bytes())
    }
}

/// Canonical JSON encoding: object keys sorted at every depth, no whitespace.
///
/// Two structurally equal values always produce the same bytes regardless of
/// the order their maps were built in.
pub fn canonical<T: Serialize + ?Sized>(value: &T) -> CryptoResult<Vec<u8>> {
    let value =
        serde_json::to_value(value).map_err(|e| CryptoError::SerializationError(e.to_string()))?;
    serde_json::to_vec(&sort_keys(value)).map_err(|e| CryptoError::SerializationError(e.to_string()))
}

// Rebuilds maps in key order so the output does not depend on whether
// serde_json was compiled with `preserve_order`.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_hash_basic() {
        let data = b"Hello, World!";
        assert_eq!(digest(data), digest(data));
        assert_eq!(data.as_slice().hash(), digest(data));
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(
            digest(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_hex() {
        let hash = digest(b"test");
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Hash::from_hex(&hex).unwrap(), hash);
        assert!(Hash::from_hex("abcd").is_err());
        assert!(Hash::from_hex("zz").is_err());
    }

    #[test]
    fn test_hash_serde_as_hex() {
        let hash = digest(b"serde");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_leading_zeros() {
        let mut bytes = [0xffu8; HASH_SIZE];
        bytes[0] = 0x00;
        bytes[1] = 0x0f;
        let hash = Hash::new(bytes);
        assert_eq!(hash.leading_zero_nibbles(), 3);
        assert_eq!(hash.leading_zero_bits(), 12);
        assert!(hash.to_hex().starts_with("000f"));

        assert_eq!(Hash::zero().leading_zero_nibbles(), 64);
        assert_eq!(Hash::zero().leading_zero_bits(), 256);
    }

    #[test]
    fn test_ordering_matches_hex() {
        let a = digest(b"a");
        let b = digest(b"b");
        assert_eq!(a.cmp(&b), a.to_hex().cmp(&b.to_hex()));
    }

    #[test]
    fn test_canonical_sorts_nested_keys() {
        let a = json!({"b": 1, "a": {"z": [1, 2], "y": null}});
        let bytes = canonical(&a).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":{"y":null,"z":[1,2]},"b":1}"#
        );
    }

    proptest! {
        #[test]
        fn canonical_ignores_insertion_order(
            pairs in proptest::collection::vec(("[a-z]{1,6}", any::<i64>()), 0..12)
        ) {
            let mut forward = Map::new();
            for (k, v) in &pairs {
                forward.insert(k.clone(), json!(v));
            }
            let mut backward = Map::new();
            for (k, _) in pairs.iter().rev() {
                backward.insert(k.clone(), forward[k].clone());
            }
            prop_assert_eq!(
                canonical(&Value::Object(forward)).unwrap(),
                canonical(&Value::Object(backward)).unwrap()
            );
        }
    }
}
