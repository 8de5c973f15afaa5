//! Merkle root over transaction hashes.

use neo_crypto::Crypto;
use neo_primitives::UInt256;

pub struct MerkleTree;

impl MerkleTree {
    /// Pairs adjacent hashes with double SHA-256, duplicating the last hash
    /// of an odd level. An empty list yields the zero hash.
    pub fn compute_root(hashes: &[UInt256]) -> UInt256 {
        if hashes.is_empty() {
            return UInt256::zero();
        }
        let mut level: Vec<UInt256> = hashes.to_vec();
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| {
                    let left = pair[0];
                    let right = pair.get(1).copied().unwrap_or(left);
                    let mut buf = [0u8; 64];
                    buf[..32].copy_from_slice(left.as_bytes());
                    buf[32..].copy_from_slice(right.as_bytes());
                    Crypto::hash256_uint(&buf)
                })
                .collect();
        }
        level[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_hash_is_its_own_root() {
        let h = UInt256::from_raw([1u8; 32]);
        assert_eq!(MerkleTree::compute_root(&[h]), h);
    }

    #[test]
    fn odd_level_duplicates_last() {
        let a = UInt256::from_raw([1u8; 32]);
        let b = UInt256::from_raw([2u8; 32]);
        let c = UInt256::from_raw([3u8; 32]);
        assert_eq!(
            MerkleTree::compute_root(&[a, b, c]),
            MerkleTree::compute_root(&[a, b, c, c])
        );
    }

    #[test]
    fn order_matters() {
        let a = UInt256::from_raw([1u8; 32]);
        let b = UInt256::from_raw([2u8; 32]);
        assert_ne!(
            MerkleTree::compute_root(&[a, b]),
            MerkleTree::compute_root(&[b, a])
        );
    }
}
