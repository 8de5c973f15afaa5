//! Implementation of `UInt256`, a 256-bit hash.

use crate::error::{PrimitiveError, PrimitiveResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The length of `UInt256` values in bytes.
pub const UINT256_SIZE: usize = 32;

/// A 256-bit hash stored in little-endian byte order.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct UInt256([u8; UINT256_SIZE]);

impl UInt256 {
    /// Alias matching `UInt256.Length`.
    pub const LENGTH: usize = UINT256_SIZE;

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; UINT256_SIZE])
    }

    #[inline]
    #[must_use]
    pub const fn from_raw(bytes: [u8; UINT256_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a `UInt256` from a little-endian byte slice.
    ///
    /// # Errors
    ///
    /// Returns `PrimitiveError::InvalidFormat` if the input is not exactly 32 bytes.
    pub fn from_bytes(value: &[u8]) -> PrimitiveResult<Self> {
        let bytes: [u8; UINT256_SIZE] = value.try_into().map_err(|_| {
            PrimitiveError::invalid_format(format!(
                "UInt256 requires {UINT256_SIZE} bytes, got {}",
                value.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Parses the big-endian hex form, with or without a `0x` prefix.
    pub fn parse(s: &str) -> PrimitiveResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = hex::decode(s).map_err(|e| PrimitiveError::InvalidHex(e.to_string()))?;
        bytes.reverse();
        Self::from_bytes(&bytes)
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; UINT256_SIZE] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.0.iter().rev() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UInt256({self})")
    }
}

impl FromStr for UInt256 {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; UINT256_SIZE]> for UInt256 {
    fn from(bytes: [u8; UINT256_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for UInt256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for UInt256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for UInt256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
