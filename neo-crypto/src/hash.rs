//! Hash functions.

use neo_primitives::{UInt160, UInt256};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Stateless hash helpers.
pub struct Crypto;

impl Crypto {
    pub fn sha256(data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }

    /// SHA-256 applied twice. Block, header and transaction ids use this.
    pub fn hash256(data: &[u8]) -> [u8; 32] {
        Sha256::digest(Sha256::digest(data)).into()
    }

    pub fn ripemd160(data: &[u8]) -> [u8; 20] {
        Ripemd160::digest(data).into()
    }

    /// RIPEMD-160 of SHA-256. Script hashes use this.
    pub fn hash160(data: &[u8]) -> [u8; 20] {
        Ripemd160::digest(Sha256::digest(data)).into()
    }

    pub fn hash256_uint(data: &[u8]) -> UInt256 {
        UInt256::from_raw(Self::hash256(data))
    }

    pub fn hash160_uint(data: &[u8]) -> UInt160 {
        UInt160::from_raw(Self::hash160(data))
    }
}
