//! Error types for consensus operations.
//!
//! ## Error Categories
//!
//! | Error | Description |
//! |-------|-------------|
//! | `InvalidMessageType` | Unknown leading type byte |
//! | `Format` | A decoded field violates a message invariant |
//! | `Io` | Truncated or otherwise malformed bytes |
//! | `NotValidator` | Our key is not in the validator set |
//! | `Ledger` | The ledger collaborator failed |
//! | `ChannelError` | The event receiver is gone or full |
//!
//! Format and IO errors on inbound messages never leave the service: the
//! message is logged and dropped.
//!
//! ## Example
//!
//! ```rust
//! use neo_consensus::ConsensusError;
//!
//! let err = ConsensusError::InvalidMessageType(0x30);
//! assert_eq!(err.to_string(), "Invalid consensus message type: 0x30");
//! ```

use neo_core::LedgerError;
use neo_crypto::CryptoError;
use neo_io::IoError;
use thiserror::Error;

/// Errors that can occur during consensus operations.
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// Leading type byte is not a known message type.
    #[error("Invalid consensus message type: 0x{0:02x}")]
    InvalidMessageType(u8),

    /// A field failed validation while decoding.
    #[error("Invalid consensus message field {field}: {reason}")]
    Format {
        /// Offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Malformed wire bytes.
    #[error("Malformed consensus data: {0}")]
    Io(#[from] IoError),

    /// Invalid validator index.
    #[error("Invalid validator index: {0}")]
    InvalidValidatorIndex(u16),

    /// Not a validator.
    #[error("Not a validator")]
    NotValidator,

    /// Invalid service configuration.
    #[error("Invalid consensus configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// Signing failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Witness or script construction failed.
    #[error("Block assembly failed: {0}")]
    Assembly(#[from] LedgerError),

    /// The ledger collaborator reported a failure.
    #[error("Ledger error: {message}")]
    Ledger {
        /// Error message.
        message: String,
    },

    /// Channel send error.
    #[error("Channel send error: {0}")]
    ChannelError(String),
}

impl ConsensusError {
    /// Create a format error naming the offending field.
    pub fn format<S: Into<String>>(field: &'static str, reason: S) -> Self {
        Self::Format {
            field,
            reason: reason.into(),
        }
    }

    /// Create a ledger error.
    pub fn ledger<S: Into<String>>(message: S) -> Self {
        Self::Ledger {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// True for errors caused by the bytes of an inbound message.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMessageType(_) | Self::Format { .. } | Self::Io(_)
        )
    }
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
