//! The ledger as seen by consensus.

use crate::ConsensusResult;
use neo_core::Transaction;
use neo_crypto::ECPoint;
use neo_primitives::UInt256;

/// Chain and memory-pool access the round coordinator needs.
pub trait Ledger: Send + Sync {
    /// Up to `max` pool transactions for a new proposal, in priority order.
    fn pool_transactions(&self, max: usize) -> ConsensusResult<Vec<Transaction>>;

    /// A pool transaction by hash.
    fn pool_transaction(&self, hash: &UInt256) -> ConsensusResult<Option<Transaction>>;

    /// True when the transaction is already persisted.
    fn contains_transaction(&self, hash: &UInt256) -> ConsensusResult<bool>;

    /// Full verification of a proposed transaction.
    fn verify_transaction(&self, transaction: &Transaction) -> ConsensusResult<bool> {
        Ok(transaction.verify_structure().is_ok())
    }

    /// Validator set after applying `transactions`; determines the proposal's
    /// `next_consensus`.
    fn next_validators(&self, transactions: &[Transaction]) -> ConsensusResult<Vec<ECPoint>>;
}
