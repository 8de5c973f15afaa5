//! Blockchain orchestrator.
//!
//! Turns finalized blocks into [`ChangeSet`]s, commits them through the
//! storage façade and tracks the chain tip. It also serves as the
//! [`Ledger`] consensus proposes from and validates against.

use crate::error::{ChainError, ChainResult};
use crate::mempool::MemoryPool;
use neo_consensus::{ConsensusError, ConsensusResult, Ledger};
use neo_core::multisig::{byzantine_quorum, consensus_address, verify_multisig_witness};
use neo_core::{
    Account, AccountInput, Block, BlockData, Header, Input, MerkleTree, Output, Transaction,
    TransactionData, Witness,
};
use neo_crypto::ECPoint;
use neo_primitives::{UInt160, UInt256};
use neo_storage::{
    AccountTable, AccountUnspentTable, BlockDataTable, BlockKey, BlockTable, Change, ChangeSet,
    CommitStorage, EntityKey, EntityValue, HeaderTable, OutputRecord, OutputTable, ReadSettings,
    ReadStorage, TransactionTable,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Consensus data of the genesis block.
pub const GENESIS_NONCE: u64 = 2_083_236_893;

/// Timestamp of the genesis block: 2016-07-15T15:08:21Z.
pub const GENESIS_TIMESTAMP: u32 = 1_468_595_301;

/// Verification script of the genesis witness (`PUSHT`).
const GENESIS_VERIFICATION: [u8; 1] = [0x51];

pub const DEFAULT_POOL_CAPACITY: usize = 50_000;

/// The storage capabilities the orchestrator needs.
pub trait ChainStorage: ReadStorage + ReadSettings + CommitStorage + Send + Sync {}

impl<T: ReadStorage + ReadSettings + CommitStorage + Send + Sync> ChainStorage for T {}

#[derive(Debug, Clone)]
struct ChainTip {
    header: Header,
    block_data: BlockData,
}

/// Builds the genesis block for a validator set.
pub fn genesis_block(validators: &[ECPoint]) -> ChainResult<Block> {
    let miner = Transaction::miner(GENESIS_NONCE as u32);
    let header = Header {
        version: 0,
        previous_hash: UInt256::zero(),
        merkle_root: MerkleTree::compute_root(&[miner.hash()]),
        timestamp: GENESIS_TIMESTAMP,
        index: 0,
        consensus_data: GENESIS_NONCE,
        next_consensus: consensus_address(validators)?,
        witness: Witness::new(Vec::new(), GENESIS_VERIFICATION.to_vec()),
    };
    Ok(Block::new(header, vec![miner]))
}

pub struct Blockchain<S: ?Sized> {
    storage: Arc<S>,
    mempool: MemoryPool,
    validators: Vec<ECPoint>,
    tip: RwLock<ChainTip>,
}

impl<S: ChainStorage + ?Sized> Blockchain<S> {
    /// Loads the chain tip from `storage`, persisting the genesis block into
    /// an empty store first.
    pub fn open(storage: Arc<S>, validators: Vec<ECPoint>, pool_capacity: usize) -> ChainResult<Self> {
        let tip = match storage.max_block_hash()? {
            Some(hash) => {
                let header = storage.get::<HeaderTable>(&BlockKey::Hash(hash))?;
                let block_data = storage.get::<BlockDataTable>(&hash)?;
                info!(height = header.index, %hash, "Loaded chain tip");
                ChainTip { header, block_data }
            }
            None => {
                let genesis = genesis_block(&validators)?;
                let (changes, block_data) = build_change_set(storage.as_ref(), &genesis, None)?;
                storage.commit(&changes)?;
                info!(hash = %genesis.hash(), "Persisted genesis block");
                ChainTip {
                    header: genesis.header,
                    block_data,
                }
            }
        };

        Ok(Self {
            storage,
            mempool: MemoryPool::new(pool_capacity),
            validators,
            tip: RwLock::new(tip),
        })
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn mempool(&self) -> &MemoryPool {
        &self.mempool
    }

    pub fn validators(&self) -> &[ECPoint] {
        &self.validators
    }

    /// Header of the highest persisted block.
    pub fn tip(&self) -> Header {
        self.tip.read().header.clone()
    }

    pub fn height(&self) -> u32 {
        self.tip.read().header.index
    }

    pub fn block(&self, key: impl Into<BlockKey>) -> ChainResult<Option<Block>> {
        Ok(self.storage.try_get::<BlockTable>(&key.into())?)
    }

    /// Verifies a transaction against the chain and adds it to the pool.
    pub fn add_transaction(&self, transaction: Transaction) -> ChainResult<bool> {
        if !self.check_transaction(&transaction)? {
            return Ok(false);
        }
        if self.mempool.has_conflict(&transaction) {
            debug!(hash = %transaction.hash(), "Transaction conflicts with a pool entry");
            return Ok(false);
        }
        Ok(self.mempool.add(transaction))
    }

    /// Structure, not yet persisted, and every input an unspent output.
    /// Pool conflicts are checked in `add_transaction` only; consensus checks
    /// proposals against the other proposed transactions.
    fn check_transaction(&self, transaction: &Transaction) -> ChainResult<bool> {
        let hash = transaction.hash();
        if let Err(err) = transaction.verify_structure() {
            debug!(%hash, %err, "Transaction failed structural checks");
            return Ok(false);
        }
        if self.storage.try_get::<TransactionTable>(&hash)?.is_some() {
            return Ok(false);
        }
        for input in &transaction.inputs {
            let Some(record) = self
                .storage
                .try_get::<OutputTable>(&(input.prev_hash, input.prev_index))?
            else {
                debug!(%hash, prev_hash = %input.prev_hash, "Transaction spends an unknown output");
                return Ok(false);
            };
            let unspent = AccountInput {
                hash: record.output.script_hash,
                input: *input,
            };
            if self.storage.try_get::<AccountUnspentTable>(&unspent)?.is_none() {
                debug!(%hash, prev_hash = %input.prev_hash, "Transaction spends a spent output");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Validates `block` against the tip and commits it.
    pub fn persist_block(&self, block: &Block) -> ChainResult<()> {
        let tip = self.tip.read().clone();
        let index = block.index();

        if index != tip.header.index + 1 || block.header.previous_hash != tip.header.hash() {
            return Err(ChainError::invalid_block(
                index,
                format!("does not extend tip {} at height {}", tip.header.hash(), tip.header.index),
            ));
        }
        if block.header.timestamp <= tip.header.timestamp {
            return Err(ChainError::invalid_block(index, "timestamp not after previous block"));
        }
        if !block.transactions.first().is_some_and(Transaction::is_miner) {
            return Err(ChainError::invalid_block(index, "first transaction is not a miner transaction"));
        }
        if block.compute_merkle_root() != block.header.merkle_root {
            return Err(ChainError::invalid_block(index, "merkle root mismatch"));
        }
        let witness = &block.header.witness;
        if witness.script_hash() != tip.header.next_consensus
            || !verify_multisig_witness(
                witness,
                &block.header.unsigned_data(),
                byzantine_quorum(self.validators.len()),
                &self.validators,
            )
        {
            return Err(ChainError::invalid_block(index, "witness does not satisfy the validators"));
        }

        let (changes, block_data) = build_change_set(self.storage.as_ref(), block, Some(&tip.block_data))?;
        self.storage.commit(&changes)?;

        let hashes: Vec<UInt256> = block.transactions.iter().map(Transaction::hash).collect();
        let mut removed = self.mempool.remove_all(&hashes);
        removed += self
            .mempool
            .remove_spending(block.transactions.iter().flat_map(|tx| &tx.inputs));
        *self.tip.write() = ChainTip {
            header: block.header.clone(),
            block_data,
        };

        info!(
            height = index,
            hash = %block.hash(),
            transactions = block.transactions.len(),
            changes = changes.len(),
            pool_removed = removed,
            "Block persisted"
        );
        Ok(())
    }
}

/// The changes persisting `block` produces, plus its bookkeeping record.
fn build_change_set<S: ReadStorage + ?Sized>(
    storage: &S,
    block: &Block,
    previous: Option<&BlockData>,
) -> ChainResult<(ChangeSet, BlockData)> {
    let index = block.index();
    let block_hash = block.hash();
    let mut changes: ChangeSet = vec![
        Change::Add(EntityValue::Header(block.header.clone())),
        Change::Add(EntityValue::Block(block.clone())),
    ];

    let mut global_index = previous.map_or(0, |data| data.last_global_transaction_index + 1);
    let mut created: HashMap<Input, Output> = HashMap::new();
    let mut spent: HashSet<Input> = HashSet::new();
    let mut accounts: BTreeMap<UInt160, Account> = BTreeMap::new();

    for (position, transaction) in block.transactions.iter().enumerate() {
        let hash = transaction.hash();
        changes.push(Change::Add(EntityValue::Transaction(transaction.clone())));
        changes.push(Change::Add(EntityValue::TransactionData(TransactionData {
            hash,
            block_hash,
            start_height: index,
            index: position as u32,
            global_index,
        })));
        global_index += 1;

        for input in &transaction.inputs {
            if !spent.insert(*input) {
                return Err(ChainError::invalid_block(index, format!("output {} spent twice", input.prev_hash)));
            }
            let output = match created.get(input) {
                Some(output) => *output,
                None => {
                    let record = storage
                        .try_get::<OutputTable>(&(input.prev_hash, input.prev_index))?
                        .ok_or_else(|| {
                            ChainError::invalid_block(index, format!("unknown output {}:{}", input.prev_hash, input.prev_index))
                        })?;
                    let unspent = AccountInput {
                        hash: record.output.script_hash,
                        input: *input,
                    };
                    if storage.try_get::<AccountUnspentTable>(&unspent)?.is_none() {
                        return Err(ChainError::invalid_block(
                            index,
                            format!("output {}:{} already spent", input.prev_hash, input.prev_index),
                        ));
                    }
                    record.output
                }
            };
            let owner = AccountInput {
                hash: output.script_hash,
                input: *input,
            };
            changes.push(Change::Delete(EntityKey::AccountUnspent(owner)));
            changes.push(Change::Add(EntityValue::AccountUnclaimed(owner)));
            load_account(storage, &mut accounts, output.script_hash)?;
            if let Some(account) = accounts.get_mut(&output.script_hash) {
                adjust_balance(account, output.asset_id, -output.value);
            }
        }

        for (n, output) in transaction.outputs.iter().enumerate() {
            let prev_index = u16::try_from(n)
                .map_err(|_| ChainError::invalid_block(index, format!("transaction {hash} has too many outputs")))?;
            let input = Input {
                prev_hash: hash,
                prev_index,
            };
            changes.push(Change::Add(EntityValue::Output(OutputRecord {
                hash,
                index: prev_index,
                output: *output,
            })));
            changes.push(Change::Add(EntityValue::AccountUnspent(AccountInput {
                hash: output.script_hash,
                input,
            })));
            created.insert(input, *output);
            load_account(storage, &mut accounts, output.script_hash)?;
            if let Some(account) = accounts.get_mut(&output.script_hash) {
                adjust_balance(account, output.asset_id, output.value);
            }
        }
    }

    changes.extend(accounts.into_values().map(|account| Change::Add(EntityValue::Account(account))));

    let block_data = BlockData {
        hash: block_hash,
        last_global_transaction_index: global_index.saturating_sub(1),
        last_global_action_index: previous.map_or(0, |data| data.last_global_action_index),
        system_fee: previous.map_or(0, |data| data.system_fee),
    };
    changes.push(Change::Add(EntityValue::BlockData(block_data.clone())));
    Ok((changes, block_data))
}

fn load_account<S: ReadStorage + ?Sized>(
    storage: &S,
    accounts: &mut BTreeMap<UInt160, Account>,
    hash: UInt160,
) -> ChainResult<()> {
    if !accounts.contains_key(&hash) {
        let account = storage
            .try_get::<AccountTable>(&hash)?
            .unwrap_or_else(|| Account::new(hash));
        accounts.insert(hash, account);
    }
    Ok(())
}

fn adjust_balance(account: &mut Account, asset: UInt256, delta: i64) {
    match account.balances.iter().position(|(id, _)| *id == asset) {
        Some(i) => {
            account.balances[i].1 = account.balances[i].1.saturating_add(delta);
            if account.balances[i].1 == 0 {
                account.balances.remove(i);
            }
        }
        None if delta != 0 => account.balances.push((asset, delta)),
        None => {}
    }
}

fn ledger_error(err: ChainError) -> ConsensusError {
    ConsensusError::ledger(err.to_string())
}

impl<S: ChainStorage + ?Sized> Ledger for Blockchain<S> {
    fn pool_transactions(&self, max: usize) -> ConsensusResult<Vec<Transaction>> {
        Ok(self.mempool.take(max))
    }

    fn pool_transaction(&self, hash: &UInt256) -> ConsensusResult<Option<Transaction>> {
        Ok(self.mempool.get(hash))
    }

    fn contains_transaction(&self, hash: &UInt256) -> ConsensusResult<bool> {
        self.storage
            .try_get::<TransactionTable>(hash)
            .map(|found| found.is_some())
            .map_err(|e| ledger_error(e.into()))
    }

    fn verify_transaction(&self, transaction: &Transaction) -> ConsensusResult<bool> {
        if transaction.is_miner() {
            if !transaction.inputs.is_empty() || !transaction.outputs.is_empty() {
                warn!(hash = %transaction.hash(), "Miner transaction carries inputs or outputs");
                return Ok(false);
            }
            return Ok(transaction.verify_structure().is_ok());
        }
        self.check_transaction(transaction).map_err(ledger_error)
    }

    fn next_validators(&self, _transactions: &[Transaction]) -> ConsensusResult<Vec<ECPoint>> {
        Ok(self.validators.clone())
    }
}
