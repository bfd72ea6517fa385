// ledger-crypto/src/merkle.rs

use crate::hash::{digest, Hash};

/// Leaf value that stands in for an empty set
pub const EMPTY_ROOT_SEED: &str = "empty";

/// Reduce a set of leaf digests to a single root.
///
/// Leaves are sorted before pairing, so the root binds the *set* of leaves
/// and not their order. This is a content checksum and cannot be used to
/// prove inclusion position. Each parent is `digest(left_hex + right_hex)`;
/// an odd trailing node is paired with itself.
pub fn merkle_like_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return digest(EMPTY_ROOT_SEED);
    }

    let mut layer = leaves.to_vec();
    layer.sort();

    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or(left);
                combine_hashes(left, right)
            })
            .collect();
    }

    layer[0]
}

fn combine_hashes(left: Hash, right: Hash) -> Hash {
    let mut combined = String::with_capacity(128);
    combined.push_str(&left.to_hex());
    combined.push_str(&right.to_hex());
    digest(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_root() {
        assert_eq!(merkle_like_root(&[]), digest("empty"));
    }

    #[test]
    fn test_single_leaf_is_root() {
        let leaf = digest(b"single");
        assert_eq!(merkle_like_root(&[leaf]), leaf);
    }

    #[test]
    fn test_two_leaves() {
        let a = digest(b"a");
        let b = digest(b"b");
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let expected = digest(format!("{}{}", lo.to_hex(), hi.to_hex()));
        assert_eq!(merkle_like_root(&[a, b]), expected);
        assert_eq!(merkle_like_root(&[b, a]), expected);
    }

    #[test]
    fn test_odd_leaf_pairs_with_itself() {
        let mut leaves = vec![digest(b"x"), digest(b"y"), digest(b"z")];
        leaves.sort();
        let left = combine_hashes(leaves[0], leaves[1]);
        let right = combine_hashes(leaves[2], leaves[2]);
        assert_eq!(merkle_like_root(&leaves), combine_hashes(left, right));
    }

    #[test]
    fn test_content_changes_root() {
        let base = vec![digest(b"apple"), digest(b"banana")];
        let changed = vec![digest(b"apple"), digest(b"cherry")];
        assert_ne!(merkle_like_root(&base), merkle_like_root(&changed));
    }

    proptest! {
        #[test]
        fn root_is_order_independent(
            seeds in proptest::collection::vec(any::<u32>(), 1..20),
            rotate in any::<usize>()
        ) {
            let leaves: Vec<Hash> = seeds.iter().map(|s| digest(s.to_be_bytes())).collect();
            let mut shuffled = leaves.clone();
            shuffled.reverse();
            let len = shuffled.len();
            shuffled.rotate_left(rotate % len);
            prop_assert_eq!(merkle_like_root(&leaves), merkle_like_root(&shuffled));
        }
    }
}
