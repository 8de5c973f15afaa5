//! secp256r1 key pairs.

use crate::{CryptoError, CryptoResult, ECPoint, Signature, SIGNATURE_SIZE};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::SigningKey;
use std::fmt;

/// A private signing key with its cached public point.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    public_key: ECPoint,
}

impl KeyPair {
    /// Generates a fresh key from the OS random source.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Loads a key from its 32-byte big-endian scalar.
    pub fn from_private_key(bytes: &[u8]) -> CryptoResult<Self> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|e| CryptoError::InvalidPrivateKey {
                message: e.to_string(),
            })?;
        Ok(Self::from_signing_key(signing_key))
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|e| {
            CryptoError::InvalidPrivateKey {
                message: e.to_string(),
            }
        })?;
        Self::from_private_key(&bytes)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = ECPoint::from_verifying_key(signing_key.verifying_key());
        Self {
            signing_key,
            public_key,
        }
    }

    pub fn public_key(&self) -> ECPoint {
        self.public_key
    }

    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    /// Signs `message` (SHA-256 is applied internally).
    pub fn sign(&self, message: &[u8]) -> CryptoResult<Signature> {
        let sig: p256::ecdsa::Signature =
            self.signing_key
                .try_sign(message)
                .map_err(|e| CryptoError::SignFailed {
                    message: e.to_string(),
                })?;
        let bytes = sig.to_bytes();
        let mut out = [0u8; SIGNATURE_SIZE];
        out.copy_from_slice(&bytes);
        Ok(Signature::from_raw(out))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
