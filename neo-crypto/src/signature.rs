//! Fixed-size ECDSA signatures.

use crate::{CryptoError, CryptoResult, ECPoint};
use neo_io::{BinaryWriter, IoResult, MemoryReader, Serializable};
use p256::ecdsa::signature::Verifier;
use std::fmt;

pub const SIGNATURE_SIZE: usize = 64;

/// A secp256r1 signature encoded as `r || s`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl Signature {
    pub const fn from_raw(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let raw: [u8; SIGNATURE_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    /// Verifies this signature over `message` (SHA-256 is applied internally).
    ///
    /// Returns `false` for malformed signatures or keys instead of an error.
    pub fn verify(&self, message: &[u8], public_key: &ECPoint) -> bool {
        let Ok(key) = public_key.to_verifying_key() else {
            return false;
        };
        let Ok(sig) = p256::ecdsa::Signature::try_from(self.0.as_slice()) else {
            return false;
        };
        key.verify(message, &sig).is_ok()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..8]))
    }
}

impl Serializable for Signature {
    fn size(&self) -> usize {
        SIGNATURE_SIZE
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_bytes(&self.0);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self(reader.read_array::<SIGNATURE_SIZE>()?))
    }
}
