//! Compressed secp256r1 public keys.

use crate::{CryptoError, CryptoResult};
use neo_io::{BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use p256::ecdsa::VerifyingKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const COMPRESSED_POINT_SIZE: usize = 33;

/// A secp256r1 point in SEC1 compressed form.
///
/// Construction validates that the bytes decode to a point on the curve, so
/// every `ECPoint` can be turned into a verifying key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ECPoint([u8; COMPRESSED_POINT_SIZE]);

impl ECPoint {
    /// Parses SEC1 bytes (compressed or uncompressed) and stores the compressed form.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let key = VerifyingKey::from_sec1_bytes(bytes).map_err(|e| {
            CryptoError::InvalidPublicKey {
                message: e.to_string(),
            }
        })?;
        Ok(Self::from_verifying_key(&key))
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|e| {
            CryptoError::InvalidPublicKey {
                message: e.to_string(),
            }
        })?;
        Self::from_bytes(&bytes)
    }

    pub(crate) fn from_verifying_key(key: &VerifyingKey) -> Self {
        let encoded = key.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_POINT_SIZE];
        out.copy_from_slice(encoded.as_bytes());
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; COMPRESSED_POINT_SIZE] {
        &self.0
    }

    pub fn to_verifying_key(&self) -> CryptoResult<VerifyingKey> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|e| CryptoError::InvalidPublicKey {
            message: e.to_string(),
        })
    }
}

impl fmt::Display for ECPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ECPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ECPoint({})", hex::encode(self.0))
    }
}

impl Serializable for ECPoint {
    fn size(&self) -> usize {
        COMPRESSED_POINT_SIZE
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_bytes(&self.0);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let bytes = reader.read_array::<COMPRESSED_POINT_SIZE>()?;
        Self::from_bytes(&bytes).map_err(|e| IoError::invalid_data(e.to_string()))
    }
}

impl Serialize for ECPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ECPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
