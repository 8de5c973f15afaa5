//! Error types for chain operations.

use neo_core::LedgerError;
use neo_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The block cannot extend the current tip.
    #[error("Invalid block {index}: {reason}")]
    InvalidBlock { index: u32, reason: String },
}

impl ChainError {
    pub fn invalid_block<S: Into<String>>(index: u32, reason: S) -> Self {
        Self::InvalidBlock {
            index,
            reason: reason.into(),
        }
    }
}

pub type ChainResult<T> = Result<T, ChainError>;
