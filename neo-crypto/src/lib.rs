//! # Neo Crypto
//!
//! Hash functions and secp256r1 signing used by consensus and the ledger.
//!
//! - [`Crypto`]: SHA-256, double SHA-256 (`hash256`) and `hash160`
//! - [`ECPoint`]: a validated, compressed secp256r1 public key
//! - [`KeyPair`]: a signing key plus its public point
//! - [`Signature`]: a 64-byte `r || s` ECDSA signature

pub mod ecc;
pub mod error;
pub mod hash;
pub mod keypair;
pub mod signature;

pub use ecc::ECPoint;
pub use error::{CryptoError, CryptoResult};
pub use hash::Crypto;
pub use keypair::KeyPair;
pub use signature::{Signature, SIGNATURE_SIZE};
