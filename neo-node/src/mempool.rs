//! In-memory pool of verified transactions waiting for a block.

use neo_core::{Input, Transaction};
use neo_primitives::UInt256;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// A transaction entry in the mempool
#[derive(Debug, Clone)]
struct PoolEntry {
    transaction: Transaction,
    /// Arrival order; proposals take the oldest entries first.
    sequence: u64,
}

#[derive(Debug, Default)]
struct PoolState {
    entries: HashMap<UInt256, PoolEntry>,
    order: BTreeMap<u64, UInt256>,
    /// Pool entry spending each claimed output.
    claimed: HashMap<Input, UInt256>,
    next_sequence: u64,
}

impl PoolState {
    fn conflicts(&self, hash: &UInt256, transaction: &Transaction) -> bool {
        transaction
            .inputs
            .iter()
            .any(|input| self.claimed.get(input).is_some_and(|owner| owner != hash))
    }

    fn remove(&mut self, hash: &UInt256) -> bool {
        let Some(entry) = self.entries.remove(hash) else {
            return false;
        };
        self.order.remove(&entry.sequence);
        for input in &entry.transaction.inputs {
            self.claimed.remove(input);
        }
        true
    }
}

/// Transactions accepted for inclusion, in arrival order.
#[derive(Debug)]
pub struct MemoryPool {
    state: RwLock<PoolState>,
    capacity: usize,
}

impl MemoryPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(PoolState::default()),
            capacity,
        }
    }

    /// Adds a transaction. Miner transactions, duplicates, transactions
    /// spending an output another entry already spends, and additions to a
    /// full pool are refused.
    pub fn add(&self, transaction: Transaction) -> bool {
        if transaction.is_miner() {
            return false;
        }
        let hash = transaction.hash();
        let mut state = self.state.write();
        if state.entries.contains_key(&hash) || state.entries.len() >= self.capacity {
            return false;
        }
        if state.conflicts(&hash, &transaction) {
            debug!(%hash, "Transaction spends an output already spent in the pool");
            return false;
        }
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.order.insert(sequence, hash);
        for input in &transaction.inputs {
            state.claimed.insert(*input, hash);
        }
        state.entries.insert(
            hash,
            PoolEntry {
                transaction,
                sequence,
            },
        );
        debug!(%hash, pool_size = state.entries.len(), "Transaction added to pool");
        true
    }

    pub fn get(&self, hash: &UInt256) -> Option<Transaction> {
        self.state
            .read()
            .entries
            .get(hash)
            .map(|entry| entry.transaction.clone())
    }

    pub fn contains(&self, hash: &UInt256) -> bool {
        self.state.read().entries.contains_key(hash)
    }

    /// True when another pool entry spends one of the transaction's inputs.
    pub fn has_conflict(&self, transaction: &Transaction) -> bool {
        self.state.read().conflicts(&transaction.hash(), transaction)
    }

    /// Up to `max` transactions, oldest first.
    pub fn take(&self, max: usize) -> Vec<Transaction> {
        let state = self.state.read();
        state
            .order
            .values()
            .take(max)
            .filter_map(|hash| state.entries.get(hash))
            .map(|entry| entry.transaction.clone())
            .collect()
    }

    /// Drops the given transactions, typically those of a persisted block.
    pub fn remove_all<'a>(&self, hashes: impl IntoIterator<Item = &'a UInt256>) -> usize {
        let mut state = self.state.write();
        hashes.into_iter().filter(|hash| state.remove(hash)).count()
    }

    /// Drops entries spending any of `inputs`, which a persisted block spent.
    pub fn remove_spending<'a>(&self, inputs: impl IntoIterator<Item = &'a Input>) -> usize {
        let mut state = self.state.write();
        let owners: Vec<UInt256> = inputs
            .into_iter()
            .filter_map(|input| state.claimed.get(input).copied())
            .collect();
        owners.iter().filter(|hash| state.remove(hash)).count()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
