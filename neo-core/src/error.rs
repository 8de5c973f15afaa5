use neo_primitives::UInt256;
use thiserror::Error;

/// Structural validation failures for ledger entities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Transaction {hash} spends input {prev_hash}:{prev_index} twice")]
    DuplicateInput {
        hash: UInt256,
        prev_hash: UInt256,
        prev_index: u16,
    },

    #[error("Miner transaction {0} must not have inputs")]
    MinerWithInputs(UInt256),

    #[error("Transaction {0} has a negative output value")]
    NegativeOutput(UInt256),

    #[error("Invalid multi-signature parameters: {message}")]
    InvalidMultiSig { message: String },
}

pub type LedgerResult<T> = Result<T, LedgerError>;
