//! Error types for storage operations.
//!
//! | Error | Meaning |
//! |-------|---------|
//! | `KeyNotFound` | `get` on an absent key; `try_get` returns `None` instead |
//! | `Corrupt` | stored bytes failed to decode |
//! | `Backend` | the backing key/value store reported a failure |
//! | `Inconsistent` | a previous commit failed part-way; the store refuses all access |

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Key not found in storage.
    #[error("Key not found: {entity} {key}")]
    KeyNotFound {
        /// Entity type that was looked up.
        entity: &'static str,
        /// Hex encoding of the storage key.
        key: String,
    },

    /// Stored value could not be decoded.
    #[error("Corrupt {entity} record: {message}")]
    Corrupt {
        entity: &'static str,
        message: String,
    },

    /// Backend-specific error.
    #[error("Storage backend error: {message}")]
    Backend {
        /// Error message from the backend.
        message: String,
    },

    /// A backing commit failed after the cache was updated.
    #[error("Storage is inconsistent after a failed commit: {message}")]
    Inconsistent { message: String },
}

impl StorageError {
    pub fn key_not_found(entity: &'static str, key: &[u8]) -> Self {
        Self::KeyNotFound {
            entity,
            key: hex::encode(key),
        }
    }

    pub fn corrupt<S: Into<String>>(entity: &'static str, message: S) -> Self {
        Self::Corrupt {
            entity,
            message: message.into(),
        }
    }

    /// Create a backend error.
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// True for errors after which the store must not be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Inconsistent { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
