//! Full block: header plus transactions.

use crate::{Header, MerkleTree, Transaction, MAX_TRANSACTIONS_PER_BLOCK};
use neo_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use neo_primitives::UInt256;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    pub fn hash(&self) -> UInt256 {
        self.header.hash()
    }

    pub fn index(&self) -> u32 {
        self.header.index
    }

    pub fn transaction_hashes(&self) -> Vec<UInt256> {
        self.transactions.iter().map(Transaction::hash).collect()
    }

    /// Recomputes the Merkle root from the transactions.
    pub fn compute_merkle_root(&self) -> UInt256 {
        MerkleTree::compute_root(&self.transaction_hashes())
    }
}

impl Serializable for Block {
    fn size(&self) -> usize {
        self.header.size() + helper::get_array_size(&self.transactions)
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        self.header.serialize(writer);
        writer.write_serializable_array(&self.transactions);
    }

    /// Rejects blocks whose first transaction is not the miner transaction,
    /// that repeat a transaction, or whose Merkle root does not match.
    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let header = Header::deserialize(reader)?;
        let transactions: Vec<Transaction> =
            reader.read_serializable_array(MAX_TRANSACTIONS_PER_BLOCK)?;
        match transactions.first() {
            Some(tx) if tx.is_miner() => {}
            _ => return Err(IoError::invalid_data("Block must start with a miner transaction")),
        }
        if transactions.iter().skip(1).any(Transaction::is_miner) {
            return Err(IoError::invalid_data("Block has more than one miner transaction"));
        }
        let block = Self::new(header, transactions);
        let hashes = block.transaction_hashes();
        if hashes.iter().collect::<HashSet<_>>().len() != hashes.len() {
            return Err(IoError::invalid_data("Block contains duplicate transactions"));
        }
        if MerkleTree::compute_root(&hashes) != block.header.merkle_root {
            return Err(IoError::invalid_data("Block merkle root mismatch"));
        }
        Ok(block)
    }
}
