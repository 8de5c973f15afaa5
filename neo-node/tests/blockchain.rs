//! Persisting blocks through the cached storage façade.

use neo_core::multisig::create_multisig_witness;
use neo_core::{
    Attribute, Block, Header, Input, MerkleTree, Output, Transaction, TransactionKind,
};
use neo_crypto::KeyPair;
use neo_node::{genesis_block, Blockchain, ChainError, NodeStorage, DEFAULT_POOL_CAPACITY};
use neo_primitives::{UInt160, UInt256};
use neo_storage::{
    AccountTable, AccountUnclaimedTable, AccountUnspentTable, BlockKey, CachedStorage,
    HeaderTable, KeyValueStore, LedgerStore, MemoryStore, ReadGetAllStorage, ReadStorage,
    TransactionDataTable,
};
use std::sync::Arc;

const NEO: UInt256 = UInt256::from_raw([0xc5; 32]);

fn storage(backend: Arc<dyn KeyValueStore>) -> Arc<NodeStorage> {
    Arc::new(CachedStorage::new(LedgerStore::new(backend), 1 << 20))
}

fn open(key: &KeyPair, backend: Arc<dyn KeyValueStore>) -> Blockchain<NodeStorage> {
    Blockchain::open(storage(backend), vec![key.public_key()], DEFAULT_POOL_CAPACITY).unwrap()
}

fn transfer(inputs: Vec<Input>, outputs: Vec<(UInt160, i64)>, tag: u8) -> Transaction {
    Transaction {
        version: 0,
        kind: TransactionKind::Contract,
        attributes: vec![Attribute {
            usage: 0xf0,
            data: vec![tag],
        }],
        inputs,
        outputs: outputs
            .into_iter()
            .map(|(script_hash, value)| Output {
                asset_id: NEO,
                value,
                script_hash,
            })
            .collect(),
        scripts: Vec::new(),
    }
}

/// A block on top of the chain tip, signed by the single validator.
fn next_block(chain: &Blockchain<NodeStorage>, key: &KeyPair, txs: Vec<Transaction>) -> Block {
    let tip = chain.tip();
    let mut transactions = vec![Transaction::miner(tip.index + 1)];
    transactions.extend(txs);
    let hashes: Vec<UInt256> = transactions.iter().map(Transaction::hash).collect();
    let mut header = Header {
        version: 0,
        previous_hash: tip.hash(),
        merkle_root: MerkleTree::compute_root(&hashes),
        timestamp: tip.timestamp + 15,
        index: tip.index + 1,
        consensus_data: 42,
        next_consensus: tip.next_consensus,
        witness: Default::default(),
    };
    let signature = key.sign(&header.unsigned_data()).unwrap();
    header.witness =
        create_multisig_witness(1, &[key.public_key()], &[(key.public_key(), signature)]).unwrap();
    Block::new(header, transactions)
}

#[test]
fn empty_store_gets_genesis_and_reopen_keeps_tip() {
    let key = KeyPair::generate();
    let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let chain = open(&key, Arc::clone(&backend));
    let genesis = genesis_block(&[key.public_key()]).unwrap();
    assert_eq!(chain.height(), 0);
    assert_eq!(chain.tip().hash(), genesis.hash());

    let block = next_block(&chain, &key, Vec::new());
    chain.persist_block(&block).unwrap();
    drop(chain);

    let reopened = open(&key, backend);
    assert_eq!(reopened.height(), 1);
    assert_eq!(reopened.tip(), block.header);
    assert_eq!(reopened.block(1u32).unwrap(), Some(block.clone()));
    assert_eq!(
        reopened
            .storage()
            .get::<HeaderTable>(&BlockKey::Hash(genesis.hash()))
            .unwrap(),
        genesis.header
    );
}

#[test]
fn outputs_become_unspent_and_spending_moves_them_to_unclaimed() {
    let key = KeyPair::generate();
    let chain = open(&key, Arc::new(MemoryStore::new()));
    let alice = UInt160::from_raw([1; 20]);
    let bob = UInt160::from_raw([2; 20]);

    let issue = transfer(Vec::new(), vec![(alice, 100)], 1);
    chain.persist_block(&next_block(&chain, &key, vec![issue.clone()])).unwrap();

    let storage = chain.storage();
    assert_eq!(storage.get::<AccountTable>(&alice).unwrap().balance(&NEO), 100);
    let data = storage.get::<TransactionDataTable>(&issue.hash()).unwrap();
    assert_eq!((data.start_height, data.index), (1, 1));

    let spend_input = Input {
        prev_hash: issue.hash(),
        prev_index: 0,
    };
    let pay = transfer(vec![spend_input], vec![(bob, 60), (alice, 40)], 2);
    assert!(chain.add_transaction(pay.clone()).unwrap());
    assert_eq!(chain.mempool().len(), 1);
    chain.persist_block(&next_block(&chain, &key, vec![pay.clone()])).unwrap();
    assert!(chain.mempool().is_empty());

    assert_eq!(storage.get::<AccountTable>(&alice).unwrap().balance(&NEO), 40);
    assert_eq!(storage.get::<AccountTable>(&bob).unwrap().balance(&NEO), 60);
    let alice_unspent: Vec<_> = storage
        .get_all::<AccountUnspentTable>(&alice)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(alice_unspent.len(), 1);
    assert_eq!(alice_unspent[0].input.prev_hash, pay.hash());
    let claimable: Vec<_> = storage
        .get_all::<AccountUnclaimedTable>(&alice)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(claimable[0].input, spend_input);

    // the same output cannot be spent again
    let replay = transfer(vec![spend_input], vec![(bob, 100)], 3);
    assert!(!chain.add_transaction(replay.clone()).unwrap());
    let err = chain
        .persist_block(&next_block(&chain, &key, vec![replay]))
        .unwrap_err();
    assert!(matches!(err, ChainError::InvalidBlock { index: 3, .. }), "{err}");
    assert_eq!(chain.height(), 2);
}

#[test]
fn pool_keeps_one_spend_per_output_and_drops_it_when_a_block_spends_the_output() {
    let key = KeyPair::generate();
    let chain = open(&key, Arc::new(MemoryStore::new()));
    let alice = UInt160::from_raw([1; 20]);
    let issue = transfer(Vec::new(), vec![(alice, 100)], 1);
    chain.persist_block(&next_block(&chain, &key, vec![issue.clone()])).unwrap();

    let output = Input {
        prev_hash: issue.hash(),
        prev_index: 0,
    };
    let to_bob = transfer(vec![output], vec![(UInt160::from_raw([2; 20]), 100)], 2);
    let to_carol = transfer(vec![output], vec![(UInt160::from_raw([3; 20]), 100)], 3);
    assert!(chain.add_transaction(to_bob.clone()).unwrap());
    assert!(!chain.add_transaction(to_carol.clone()).unwrap());
    assert_eq!(chain.mempool().len(), 1);

    // another validator's block settles the conflict the other way
    chain.persist_block(&next_block(&chain, &key, vec![to_carol])).unwrap();
    assert!(chain.mempool().is_empty());
    assert!(!chain.add_transaction(to_bob).unwrap());
}

#[test]
fn blocks_not_extending_the_tip_or_badly_signed_are_rejected() {
    let key = KeyPair::generate();
    let chain = open(&key, Arc::new(MemoryStore::new()));

    let mut orphan = next_block(&chain, &key, Vec::new());
    orphan.header.previous_hash = UInt256::from_raw([9; 32]);
    assert!(matches!(
        chain.persist_block(&orphan),
        Err(ChainError::InvalidBlock { index: 1, .. })
    ));

    let outsider = KeyPair::generate();
    let forged = next_block(&chain, &outsider, Vec::new());
    assert!(chain.persist_block(&forged).is_err());

    let mut reordered = next_block(&chain, &key, vec![transfer(Vec::new(), Vec::new(), 7)]);
    reordered.transactions.swap(0, 1);
    assert!(chain.persist_block(&reordered).is_err());

    assert_eq!(chain.height(), 0);
}

#[cfg(feature = "rocksdb")]
mod rocks {
    use super::*;
    use neo_storage::RocksDbStore;

    #[test]
    fn chain_survives_restart_on_rocksdb() {
        let dir = tempfile::tempdir().unwrap();
        let key = KeyPair::generate();

        let block = {
            let chain = open(&key, Arc::new(RocksDbStore::open(dir.path()).unwrap()));
            let block = next_block(&chain, &key, Vec::new());
            chain.persist_block(&block).unwrap();
            block
        };

        let chain = open(&key, Arc::new(RocksDbStore::open(dir.path()).unwrap()));
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.block(block.hash()).unwrap(), Some(block));
    }
}
