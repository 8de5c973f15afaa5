//! Key-space encoder.
//!
//! Every persisted entity type owns a one-byte prefix followed by
//! [`DELIMITER`], then the encoding of its natural key:
//!
//! - hashes and public keys as their raw stored bytes, so keys order by hash bytes
//! - numbers as fixed-width zero-padded decimal, so byte order equals numeric order
//! - composite keys as the concatenation of their fixed-width parts, with a
//!   variable-length part (storage item key) only in last position
//!
//! `[prefix, 0xff]` is the type-level maximum: it sorts after every key of
//! the type, so `[prefix, DELIMITER]..[prefix, 0xff]` scans the whole type.

use neo_core::Input;
use neo_crypto::ECPoint;
use neo_primitives::{UInt160, UInt256};

pub const DELIMITER: u8 = b':';
pub const MAX_SENTINEL: u8 = 0xff;

const U16_DIGITS: usize = 5;
const U32_DIGITS: usize = 10;
const U64_DIGITS: usize = 20;

/// Reserved prefix byte per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum KeyPrefix {
    Header = b'h',
    HeaderIndex = b'H',
    Block = b'b',
    BlockIndex = b'B',
    BlockData = b'd',
    Account = b'a',
    AccountUnspent = b'u',
    AccountUnclaimed = b'c',
    Action = b'x',
    Asset = b's',
    Transaction = b't',
    TransactionData = b'r',
    Output = b'o',
    Contract = b'C',
    StorageItem = b'i',
    Validator = b'v',
    InvocationData = b'n',
    ValidatorsCount = b'V',
    Settings = b'z',
}

impl KeyPrefix {
    pub const ALL: [KeyPrefix; 19] = [
        Self::Header,
        Self::HeaderIndex,
        Self::Block,
        Self::BlockIndex,
        Self::BlockData,
        Self::Account,
        Self::AccountUnspent,
        Self::AccountUnclaimed,
        Self::Action,
        Self::Asset,
        Self::Transaction,
        Self::TransactionData,
        Self::Output,
        Self::Contract,
        Self::StorageItem,
        Self::Validator,
        Self::InvocationData,
        Self::ValidatorsCount,
        Self::Settings,
    ];

    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Smallest key of the type.
    pub fn min_key(self) -> Vec<u8> {
        vec![self.as_byte(), DELIMITER]
    }

    /// Type-level maximum sentinel, greater than every key of the type.
    pub fn max_key(self) -> Vec<u8> {
        vec![self.as_byte(), MAX_SENTINEL]
    }
}

/// Appends natural-key parts after a prefix and delimiter.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    data: Vec<u8>,
}

impl KeyBuilder {
    pub fn new(prefix: KeyPrefix) -> Self {
        let mut data = Vec::with_capacity(64);
        data.push(prefix.as_byte());
        data.push(DELIMITER);
        Self { data }
    }

    pub fn add(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn add_uint160(self, value: &UInt160) -> Self {
        self.add(value.as_bytes())
    }

    pub fn add_uint256(self, value: &UInt256) -> Self {
        self.add(value.as_bytes())
    }

    pub fn add_u16(self, value: u16) -> Self {
        self.add_decimal(u64::from(value), U16_DIGITS)
    }

    pub fn add_u32(self, value: u32) -> Self {
        self.add_decimal(u64::from(value), U32_DIGITS)
    }

    pub fn add_u64(self, value: u64) -> Self {
        self.add_decimal(value, U64_DIGITS)
    }

    fn add_decimal(self, value: u64, width: usize) -> Self {
        let digits = format!("{value:0width$}");
        self.add(digits.as_bytes())
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// Smallest byte string greater than every string that starts with `key`.
///
/// Returns `None` when `key` is empty or all `0xff`, i.e. unbounded.
pub fn successor(key: &[u8]) -> Option<Vec<u8>> {
    let mut out = key.to_vec();
    while let Some(last) = out.pop() {
        if last < 0xff {
            out.push(last + 1);
            return Some(out);
        }
    }
    None
}

/// Half-open `[min, max)` range covering every key that starts with `prefix`.
pub fn prefix_range(prefix: Vec<u8>) -> (Vec<u8>, Vec<u8>) {
    // prefixes always start with an entity byte below 0xff
    let max = successor(&prefix).unwrap_or_else(|| vec![MAX_SENTINEL; prefix.len() + 1]);
    (prefix, max)
}

pub fn header_key(hash: &UInt256) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::Header).add_uint256(hash).build()
}

pub fn header_index_key(index: u32) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::HeaderIndex).add_u32(index).build()
}

pub fn block_key(hash: &UInt256) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::Block).add_uint256(hash).build()
}

pub fn block_index_key(index: u32) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::BlockIndex).add_u32(index).build()
}

pub fn block_data_key(hash: &UInt256) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::BlockData).add_uint256(hash).build()
}

pub fn account_key(hash: &UInt160) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::Account).add_uint160(hash).build()
}

fn account_input_key(prefix: KeyPrefix, hash: &UInt160, input: &Input) -> Vec<u8> {
    KeyBuilder::new(prefix)
        .add_uint160(hash)
        .add_uint256(&input.prev_hash)
        .add_u16(input.prev_index)
        .build()
}

pub fn account_unspent_key(hash: &UInt160, input: &Input) -> Vec<u8> {
    account_input_key(KeyPrefix::AccountUnspent, hash, input)
}

pub fn account_unclaimed_key(hash: &UInt160, input: &Input) -> Vec<u8> {
    account_input_key(KeyPrefix::AccountUnclaimed, hash, input)
}

/// All unspent or unclaimed inputs of one account.
pub fn account_input_range(prefix: KeyPrefix, hash: &UInt160) -> (Vec<u8>, Vec<u8>) {
    prefix_range(KeyBuilder::new(prefix).add_uint160(hash).build())
}

pub fn action_key(index: u64) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::Action).add_u64(index).build()
}

/// Actions with `start <= index <= stop`; a missing bound is open.
pub fn action_range(start: Option<u64>, stop: Option<u64>) -> (Vec<u8>, Vec<u8>) {
    let min = start.map_or_else(|| KeyPrefix::Action.min_key(), action_key);
    let max = stop
        .and_then(|stop| successor(&action_key(stop)))
        .unwrap_or_else(|| KeyPrefix::Action.max_key());
    (min, max)
}

pub fn asset_key(hash: &UInt256) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::Asset).add_uint256(hash).build()
}

pub fn transaction_key(hash: &UInt256) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::Transaction).add_uint256(hash).build()
}

pub fn transaction_data_key(hash: &UInt256) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::TransactionData)
        .add_uint256(hash)
        .build()
}

pub fn output_key(hash: &UInt256, index: u16) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::Output)
        .add_uint256(hash)
        .add_u16(index)
        .build()
}

pub fn contract_key(hash: &UInt160) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::Contract).add_uint160(hash).build()
}

pub fn storage_item_key(hash: &UInt160, key: &[u8]) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::StorageItem)
        .add_uint160(hash)
        .add(key)
        .build()
}

/// Storage items of one contract whose key starts with `key_prefix`, or of
/// every contract when `hash` is `None`.
pub fn storage_item_range(hash: Option<&UInt160>, key_prefix: &[u8]) -> (Vec<u8>, Vec<u8>) {
    match hash {
        Some(hash) => prefix_range(storage_item_key(hash, key_prefix)),
        None => (
            KeyPrefix::StorageItem.min_key(),
            KeyPrefix::StorageItem.max_key(),
        ),
    }
}

pub fn validator_key(public_key: &ECPoint) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::Validator)
        .add(public_key.as_bytes())
        .build()
}

pub fn invocation_data_key(hash: &UInt256) -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::InvocationData)
        .add_uint256(hash)
        .build()
}

pub fn validators_count_key() -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::ValidatorsCount).build()
}

pub fn max_header_hash_key() -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::Settings).add(b"maxHeaderHash").build()
}

pub fn max_block_hash_key() -> Vec<u8> {
    KeyBuilder::new(KeyPrefix::Settings).add(b"maxBlockHash").build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn prefixes_are_distinct() {
        let bytes: HashSet<u8> = KeyPrefix::ALL.iter().map(|p| p.as_byte()).collect();
        assert_eq!(bytes.len(), KeyPrefix::ALL.len());
        assert!(!bytes.contains(&MAX_SENTINEL));
        assert!(!bytes.contains(&DELIMITER));
    }

    #[test]
    fn key_layout() {
        let hash = UInt256::from_raw([0xab; 32]);
        let key = header_key(&hash);
        assert_eq!(key[0], b'h');
        assert_eq!(key[1], DELIMITER);
        assert_eq!(&key[2..], hash.as_bytes());
        assert_eq!(header_index_key(42), b"H:0000000042".to_vec());
        assert_eq!(output_key(&hash, 7)[34..], *b"00007");
    }

    #[test]
    fn successor_bounds() {
        assert_eq!(successor(&[1, 2, 3]), Some(vec![1, 2, 4]));
        assert_eq!(successor(&[1, 0xff, 0xff]), Some(vec![2]));
        assert_eq!(successor(&[0xff]), None);
        assert_eq!(successor(&[]), None);
    }

    #[test]
    fn max_sentinel_bounds_every_key_of_type() {
        let key = action_key(u64::MAX);
        assert!(key < KeyPrefix::Action.max_key());
        assert!(key >= KeyPrefix::Action.min_key());
        let hash = UInt256::from_raw([0xff; 32]);
        assert!(block_key(&hash) < KeyPrefix::Block.max_key());
    }

    #[test]
    fn action_range_is_inclusive() {
        let (min, max) = action_range(Some(5), Some(9));
        for i in 5..=9 {
            let key = action_key(i);
            assert!(key >= min && key < max, "index {i}");
        }
        assert!(action_key(4) < min);
        assert!(action_key(10) >= max);
    }

    #[test]
    fn storage_item_prefix_range() {
        let contract = UInt160::from_raw([1u8; 20]);
        let other = UInt160::from_raw([2u8; 20]);
        let (min, max) = storage_item_range(Some(&contract), b"bal");
        let inside = storage_item_key(&contract, b"balance");
        let outside = storage_item_key(&contract, b"bam");
        assert!(inside >= min && inside < max);
        assert!(!(outside >= min && outside < max));
        let foreign = storage_item_key(&other, b"balance");
        assert!(!(foreign >= min && foreign < max));
    }

    fn any_key() -> impl Strategy<Value = Vec<u8>> {
        let hash256 = any::<[u8; 32]>().prop_map(UInt256::from_raw);
        let hash160 = any::<[u8; 20]>().prop_map(UInt160::from_raw);
        prop_oneof![
            hash256.clone().prop_map(|h| header_key(&h)),
            any::<u32>().prop_map(header_index_key),
            hash256.clone().prop_map(|h| block_key(&h)),
            any::<u32>().prop_map(block_index_key),
            hash256.clone().prop_map(|h| block_data_key(&h)),
            hash160.clone().prop_map(|h| account_key(&h)),
            (hash160.clone(), hash256.clone(), any::<u16>()).prop_map(|(a, h, i)| {
                account_unspent_key(&a, &Input { prev_hash: h, prev_index: i })
            }),
            (hash160.clone(), hash256.clone(), any::<u16>()).prop_map(|(a, h, i)| {
                account_unclaimed_key(&a, &Input { prev_hash: h, prev_index: i })
            }),
            any::<u64>().prop_map(action_key),
            hash256.clone().prop_map(|h| asset_key(&h)),
            hash256.clone().prop_map(|h| transaction_key(&h)),
            hash256.clone().prop_map(|h| transaction_data_key(&h)),
            (hash256.clone(), any::<u16>()).prop_map(|(h, i)| output_key(&h, i)),
            hash160.clone().prop_map(|h| contract_key(&h)),
            (hash160, proptest::collection::vec(any::<u8>(), 0..16))
                .prop_map(|(h, k)| storage_item_key(&h, &k)),
            hash256.prop_map(|h| invocation_data_key(&h)),
        ]
    }

    proptest! {
        #[test]
        fn keys_of_distinct_types_never_collide(a in any_key(), b in any_key()) {
            if a[0] != b[0] {
                prop_assert_ne!(&a, &b);
            }
            // every key sits inside its own type's range
            prop_assert!(a[1] == DELIMITER);
            prop_assert!(a < vec![a[0], MAX_SENTINEL]);
        }

        #[test]
        fn action_keys_sort_numerically(a in any::<u64>(), b in any::<u64>()) {
            prop_assert_eq!(a.cmp(&b), action_key(a).cmp(&action_key(b)));
        }
    }

    #[test]
    fn action_keys_sequential_order() {
        let keys: Vec<_> = (0u64..1_000).map(action_key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
