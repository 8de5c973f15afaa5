//! Error types for wire decoding.

use thiserror::Error;

/// Errors raised while decoding binary data.
///
/// Decoding never yields a partial value: any of these aborts the read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// The buffer ended before the requested bytes.
    #[error("Unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes requested.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A variable length integer exceeded the caller's bound.
    #[error("VarInt {value} exceeds maximum {max}")]
    VarIntTooLarge {
        /// Decoded value.
        value: u64,
        /// Allowed maximum.
        max: u64,
    },

    /// Bytes were readable but not a valid encoding.
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Error message.
        message: String,
    },
}

impl IoError {
    /// Creates an invalid data error.
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}

/// Result type for IO operations.
pub type IoResult<T> = Result<T, IoError>;
