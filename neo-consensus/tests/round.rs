//! Multi-validator rounds driven in-process.

use neo_consensus::{
    ConsensusContext, ConsensusEvent, ConsensusMessage, ConsensusOptions, ConsensusPayload,
    ConsensusPhase, ConsensusResult, ConsensusService, Ledger,
};
use neo_core::multisig::{consensus_address, verify_multisig_witness};
use neo_core::{
    Attribute, Block, Header, Input, MerkleTree, Transaction, TransactionKind, Witness,
};
use neo_crypto::{ECPoint, KeyPair, Signature, SIGNATURE_SIZE};
use neo_primitives::{UInt160, UInt256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const GENESIS_TIME: u64 = 1_000;

struct PoolLedger {
    validators: Vec<ECPoint>,
    pool: Mutex<HashMap<UInt256, Transaction>>,
    persisted: Mutex<HashSet<UInt256>>,
}

impl PoolLedger {
    fn with_pool(validators: Vec<ECPoint>, pool: &[Transaction]) -> Self {
        Self {
            validators,
            pool: Mutex::new(pool.iter().map(|tx| (tx.hash(), tx.clone())).collect()),
            persisted: Mutex::new(HashSet::new()),
        }
    }
}

impl Ledger for PoolLedger {
    fn pool_transactions(&self, max: usize) -> ConsensusResult<Vec<Transaction>> {
        let pool = self.pool.lock().unwrap();
        let mut txs: Vec<Transaction> = pool.values().cloned().collect();
        txs.sort_by_key(Transaction::hash);
        txs.truncate(max);
        Ok(txs)
    }

    fn pool_transaction(&self, hash: &UInt256) -> ConsensusResult<Option<Transaction>> {
        Ok(self.pool.lock().unwrap().get(hash).cloned())
    }

    fn contains_transaction(&self, hash: &UInt256) -> ConsensusResult<bool> {
        Ok(self.persisted.lock().unwrap().contains(hash))
    }

    fn next_validators(&self, _transactions: &[Transaction]) -> ConsensusResult<Vec<ECPoint>> {
        Ok(self.validators.clone())
    }
}

fn genesis() -> Header {
    Header {
        version: 0,
        previous_hash: UInt256::zero(),
        merkle_root: UInt256::zero(),
        timestamp: GENESIS_TIME as u32,
        index: 0,
        consensus_data: 0,
        next_consensus: UInt160::zero(),
        witness: Witness::default(),
    }
}

fn contract_tx(remark: &[u8]) -> Transaction {
    Transaction {
        version: 0,
        kind: TransactionKind::Contract,
        attributes: vec![Attribute {
            usage: 0xf0,
            data: remark.to_vec(),
        }],
        inputs: Vec::new(),
        outputs: Vec::new(),
        scripts: Vec::new(),
    }
}

fn spend_tx(remark: &[u8], input: Input) -> Transaction {
    Transaction {
        inputs: vec![input],
        ..contract_tx(remark)
    }
}

fn shared_input() -> Input {
    Input {
        prev_hash: UInt256::from_raw([0x5a; 32]),
        prev_index: 0,
    }
}

/// A round-1 envelope from validator `from`.
fn signed(keys: &[KeyPair], from: usize, message: &ConsensusMessage, now: u64) -> ConsensusPayload {
    ConsensusPayload::sign(0, genesis().hash(), 1, from as u16, now as u32, message, &keys[from]).unwrap()
}

/// A correctly signed PrepareRequest from `primary` proposing `transactions`.
fn proposal(keys: &[KeyPair], primary: usize, view: u8, transactions: &[Transaction], now: u64) -> ConsensusPayload {
    let validators: Vec<ECPoint> = keys.iter().map(KeyPair::public_key).collect();
    let nonce = 42u64;
    let miner = Transaction::miner(nonce as u32);
    let mut transaction_hashes = vec![miner.hash()];
    transaction_hashes.extend(transactions.iter().map(Transaction::hash));
    let header = Header {
        version: 0,
        previous_hash: genesis().hash(),
        merkle_root: MerkleTree::compute_root(&transaction_hashes),
        timestamp: now as u32,
        index: 1,
        consensus_data: nonce,
        next_consensus: consensus_address(&validators).unwrap(),
        witness: Witness::default(),
    };
    let message = ConsensusMessage::PrepareRequest {
        view_number: view,
        nonce,
        next_consensus: header.next_consensus,
        transaction_hashes,
        miner_transaction: miner,
        signature: keys[primary].sign(&header.unsigned_data()).unwrap(),
    };
    signed(keys, primary, &message, now)
}

fn change_view_to(keys: &[KeyPair], from: usize, new_view: u8, now: u64) -> ConsensusPayload {
    signed(
        keys,
        from,
        &ConsensusMessage::ChangeView {
            view_number: 0,
            new_view_number: new_view,
        },
        now,
    )
}

fn response(keys: &[KeyPair], from: usize, view: u8, now: u64) -> ConsensusPayload {
    signed(
        keys,
        from,
        &ConsensusMessage::PrepareResponse {
            view_number: view,
            signature: Signature::from_raw([0x22; SIGNATURE_SIZE]),
        },
        now,
    )
}

struct Node {
    service: ConsensusService<PoolLedger>,
    events: mpsc::Receiver<ConsensusEvent>,
    ledger: Arc<PoolLedger>,
    log: Vec<ConsensusEvent>,
}

impl Node {
    fn ctx(&self) -> &ConsensusContext {
        self.service.context()
    }

    /// Drains pending events, returning broadcasts and logging the rest.
    fn outbox(&mut self) -> Vec<ConsensusPayload> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            match event {
                ConsensusEvent::BroadcastMessage(payload) => out.push(payload),
                other => self.log.push(other),
            }
        }
        out
    }

    fn committed(&self) -> Option<&Block> {
        self.log.iter().find_map(|event| match event {
            ConsensusEvent::BlockCommitted(block) => Some(block),
            _ => None,
        })
    }
}

struct Cluster {
    keys: Vec<KeyPair>,
    nodes: Vec<Option<Node>>,
}

impl Cluster {
    /// Four validators; `online` nodes run a service, with `pool` in their
    /// memory pool.
    fn new(online: &[usize], pool: &[Transaction], options: ConsensusOptions) -> Self {
        let keys: Vec<KeyPair> = (0..4).map(|_| KeyPair::generate()).collect();
        let validators: Vec<ECPoint> = keys.iter().map(KeyPair::public_key).collect();
        let nodes = (0..keys.len())
            .map(|i| {
                online.contains(&i).then(|| {
                    let ledger = Arc::new(PoolLedger::with_pool(validators.clone(), pool));
                    let (tx, rx) = mpsc::channel(256);
                    let service = ConsensusService::new(
                        options.clone(),
                        keys[i].clone(),
                        validators.clone(),
                        ledger.clone(),
                        tx,
                        &genesis(),
                    )
                    .unwrap();
                    Node {
                        service,
                        events: rx,
                        ledger,
                        log: Vec::new(),
                    }
                })
            })
            .collect();
        Self { keys, nodes }
    }

    fn node(&mut self, i: usize) -> &mut Node {
        self.nodes[i].as_mut().unwrap()
    }

    fn start(&mut self, now: u64) {
        for node in self.nodes.iter_mut().flatten() {
            node.service.start(now).unwrap();
        }
    }

    fn fire_timers(&mut self, now: u64) {
        for node in self.nodes.iter_mut().flatten() {
            node.service.on_timer(now).unwrap();
        }
    }

    fn deliver(&mut self, to: usize, payload: ConsensusPayload, now: u64) {
        self.node(to).service.process_message(payload, now).unwrap();
    }

    fn broadcast(&mut self, payload: &ConsensusPayload, now: u64) {
        let from = usize::from(payload.validator_index);
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if let Some(node) = node {
                if i != from {
                    node.service.process_message(payload.clone(), now).unwrap();
                }
            }
        }
    }

    /// Routes broadcasts between online nodes until the network is quiet.
    fn pump(&mut self, now: u64) {
        loop {
            let outbox: Vec<ConsensusPayload> = self
                .nodes
                .iter_mut()
                .flatten()
                .flat_map(Node::outbox)
                .collect();
            if outbox.is_empty() {
                break;
            }
            for payload in outbox {
                self.broadcast(&payload, now);
            }
        }
    }
}

fn change_views(payloads: &[ConsensusPayload]) -> Vec<ConsensusPayload> {
    payloads
        .iter()
        .filter(|p| matches!(p.message(), Ok(ConsensusMessage::ChangeView { .. })))
        .cloned()
        .collect()
}

#[test]
fn honest_quorum_commits_despite_byzantine_member() {
    let transfer = contract_tx(b"transfer");
    let mut cluster = Cluster::new(&[0, 1, 2], &[transfer.clone()], ConsensusOptions::default());
    let now = GENESIS_TIME + 15;
    cluster.start(now);

    // height 1, view 0: validator 1 proposes
    assert!(cluster.node(1).ctx().is_primary());
    cluster.fire_timers(now);
    assert_eq!(cluster.node(1).ctx().phase, ConsensusPhase::RequestSent);

    // validator 3 answers with a well-formed envelope around a bogus header signature
    let forged = ConsensusPayload::sign(
        0,
        genesis().hash(),
        1,
        3,
        now as u32,
        &ConsensusMessage::PrepareResponse {
            view_number: 0,
            signature: Signature::from_raw([0x11; SIGNATURE_SIZE]),
        },
        &cluster.keys[3],
    )
    .unwrap();
    cluster.broadcast(&forged, now);
    cluster.pump(now);

    let mut hashes = HashSet::new();
    for i in [0, 1, 2] {
        let node = cluster.node(i);
        assert_eq!(node.ctx().phase, ConsensusPhase::Committed, "node {i}");
        assert!(node.ctx().signatures[3].is_none());
        let block = node.committed().expect("block committed").clone();
        hashes.insert(block.hash());

        assert_eq!(block.index(), 1);
        assert_eq!(block.transactions.len(), 2);
        assert!(block.transactions[0].is_miner());
        assert_eq!(block.transactions[1].hash(), transfer.hash());
        assert_eq!(block.compute_merkle_root(), block.header.merkle_root);
        let keys: Vec<ECPoint> = cluster.keys.iter().map(KeyPair::public_key).collect();
        assert!(verify_multisig_witness(
            &block.header.witness,
            &block.header.unsigned_data(),
            3,
            &keys,
        ));
    }
    assert_eq!(hashes.len(), 1);
}

#[test]
fn silent_primary_is_replaced_after_timeouts() {
    let options = ConsensusOptions {
        view_change_alert_threshold: 1,
        ..ConsensusOptions::default()
    };
    let mut cluster = Cluster::new(&[0, 2, 3], &[], options);
    cluster.start(GENESIS_TIME);

    let timeout = GENESIS_TIME + 30;
    cluster.fire_timers(timeout - 1);
    cluster.pump(timeout - 1);
    assert_eq!(cluster.node(0).ctx().phase, ConsensusPhase::Idle);

    cluster.fire_timers(timeout);
    cluster.pump(timeout);

    for i in [0, 2, 3] {
        let node = cluster.node(i);
        assert_eq!(node.ctx().view_number, 1, "node {i}");
        assert!(node.log.iter().any(|e| matches!(
            e,
            ConsensusEvent::ViewChanged {
                block_index: 1,
                old_view: 0,
                new_view: 1
            }
        )));
        assert!(node
            .log
            .iter()
            .any(|e| matches!(e, ConsensusEvent::ViewChangeStalled { view: 1, .. })));
    }

    // view 1 primary is validator 2; its block time has already elapsed
    assert!(cluster.node(2).ctx().is_primary());
    assert_eq!(cluster.node(2).service.deadline(), Some(timeout));
    assert_eq!(cluster.node(0).service.deadline(), Some(timeout + 60));

    cluster.fire_timers(timeout);
    cluster.pump(timeout);
    for i in [0, 2, 3] {
        assert_eq!(cluster.node(i).ctx().phase, ConsensusPhase::Committed, "node {i}");
    }
}

#[test]
fn request_for_future_view_is_replayed_after_view_change() {
    let mut cluster = Cluster::new(&[0, 2, 3], &[], ConsensusOptions::default());
    cluster.start(GENESIS_TIME);
    let now = GENESIS_TIME + 30;
    cluster.fire_timers(now);

    let from0 = change_views(&cluster.node(0).outbox());
    let from2 = change_views(&cluster.node(2).outbox());
    let from3 = change_views(&cluster.node(3).outbox());

    // validator 2 reaches view 1 first and proposes
    cluster.deliver(2, from0[0].clone(), now);
    cluster.deliver(2, from3[0].clone(), now);
    assert_eq!(cluster.node(2).ctx().view_number, 1);
    cluster.node(2).outbox();
    cluster.node(2).service.on_timer(now).unwrap();
    let request = cluster.node(2).outbox().remove(0);
    assert!(matches!(
        request.message(),
        Ok(ConsensusMessage::PrepareRequest { view_number: 1, .. })
    ));

    // validator 0 is still at view 0 and holds the request back
    cluster.deliver(0, request, now);
    assert_eq!(cluster.node(0).ctx().view_number, 0);
    assert!(!cluster.node(0).ctx().has_proposal());

    cluster.deliver(0, from2[0].clone(), now);
    cluster.deliver(0, from3[0].clone(), now);
    let ctx = cluster.node(0).ctx();
    assert_eq!(ctx.view_number, 1);
    assert_eq!(ctx.phase, ConsensusPhase::ResponseWait);
    assert_eq!(ctx.signature_count(), 2);
}

#[test]
fn invalid_and_stale_payloads_are_ignored() {
    let mut cluster = Cluster::new(&[0], &[], ConsensusOptions::default());
    let now = GENESIS_TIME + 15;
    cluster.start(now);
    let previous = genesis().hash();
    let keys = cluster.keys.clone();

    let sign = |from: usize, block_index: u32, message: &ConsensusMessage| {
        ConsensusPayload::sign(0, previous, block_index, from as u16, now as u32, message, &keys[from])
            .unwrap()
    };
    let change_view = ConsensusMessage::ChangeView {
        view_number: 0,
        new_view_number: 1,
    };

    // another height
    cluster.deliver(0, sign(2, 7, &change_view), now);
    // tampered envelope
    let mut tampered = sign(2, 1, &change_view);
    tampered.timestamp += 1;
    cluster.deliver(0, tampered, now);
    // correctly signed but undecodable body
    let mut garbage = sign(2, 1, &change_view);
    garbage.data = vec![0x42, 0x00];
    garbage.signature = keys[2].sign(&garbage.unsigned_data()).unwrap();
    cluster.deliver(0, garbage, now);
    // out-of-range validator index
    let mut foreign = sign(2, 1, &change_view);
    foreign.validator_index = 9;
    cluster.deliver(0, foreign, now);
    // our own index echoed back
    cluster.deliver(0, sign(0, 1, &change_view), now);

    assert_eq!(cluster.node(0).ctx().expected_view, vec![0, 0, 0, 0]);
    assert!(cluster.node(0).outbox().is_empty());

    // a genuine ChangeView counts once
    cluster.deliver(0, sign(2, 1, &change_view), now);
    cluster.deliver(0, sign(2, 1, &change_view), now);
    assert_eq!(cluster.node(0).ctx().expected_view, vec![0, 0, 1, 0]);

    cluster.deliver(0, sign(1, 1, &change_view), now);
    cluster.deliver(0, sign(3, 1, &change_view), now);
    assert_eq!(cluster.node(0).ctx().view_number, 1);

    // a view-0 response arriving after the view moved on is stale
    let stale = sign(
        2,
        1,
        &ConsensusMessage::PrepareResponse {
            view_number: 0,
            signature: Signature::from_raw([0; SIGNATURE_SIZE]),
        },
    );
    cluster.deliver(0, stale, now);
    let ctx = cluster.node(0).ctx();
    assert_eq!(ctx.signature_count(), 0);
    assert!(ctx.stashed_responses.is_empty());
}

#[test]
fn missing_transaction_is_requested_then_completes_proposal() {
    let transfer = contract_tx(b"late");
    let mut cluster = Cluster::new(&[0, 1], &[transfer.clone()], ConsensusOptions::default());
    cluster.node(0).ledger.pool.lock().unwrap().clear();

    let now = GENESIS_TIME + 15;
    cluster.start(now);
    cluster.node(1).service.on_timer(now).unwrap();
    let request = cluster.node(1).outbox().remove(0);
    cluster.deliver(0, request, now);

    let node = cluster.node(0);
    assert_eq!(node.ctx().phase, ConsensusPhase::RequestReceived);
    assert!(node.outbox().is_empty());
    assert!(node.log.iter().any(|e| matches!(
        e,
        ConsensusEvent::RequestTransactions { block_index: 1, hashes } if hashes == &vec![transfer.hash()]
    )));

    node.service.on_transaction_received(transfer, now).unwrap();
    assert_eq!(node.ctx().phase, ConsensusPhase::ResponseWait);
    let response = node.outbox();
    assert!(matches!(
        response[0].message(),
        Ok(ConsensusMessage::PrepareResponse { view_number: 0, .. })
    ));
}

#[test]
fn proposal_with_persisted_transaction_triggers_change_view() {
    let transfer = contract_tx(b"replayed");
    let mut cluster = Cluster::new(&[0, 1], &[transfer.clone()], ConsensusOptions::default());
    cluster
        .node(0)
        .ledger
        .persisted
        .lock()
        .unwrap()
        .insert(transfer.hash());

    let now = GENESIS_TIME + 15;
    cluster.start(now);
    cluster.node(1).service.on_timer(now).unwrap();
    let request = cluster.node(1).outbox().remove(0);
    cluster.deliver(0, request, now);

    let node = cluster.node(0);
    assert_eq!(node.ctx().phase, ConsensusPhase::ViewChanging);
    assert_eq!(node.ctx().expected_view[0], 1);
    let sent = change_views(&node.outbox());
    assert_eq!(sent.len(), 1);
}

#[test]
fn early_response_is_applied_once_request_arrives() {
    let mut cluster = Cluster::new(&[0, 1, 2], &[], ConsensusOptions::default());
    let now = GENESIS_TIME + 15;
    cluster.start(now);
    cluster.node(1).service.on_timer(now).unwrap();
    let request = cluster.node(1).outbox().remove(0);

    cluster.deliver(2, request.clone(), now);
    let response = cluster.node(2).outbox().remove(0);

    // validator 0 sees the response first
    cluster.deliver(0, response, now);
    assert_eq!(cluster.node(0).ctx().stashed_responses.len(), 1);
    assert_eq!(cluster.node(0).ctx().signature_count(), 0);

    cluster.deliver(0, request, now);
    let ctx = cluster.node(0).ctx();
    assert_eq!(ctx.phase, ConsensusPhase::Committed);
    assert!(ctx.stashed_responses.is_empty());
    assert_eq!(ctx.signature_count(), 3);
}

#[test]
fn primary_proposes_only_one_spend_of_an_output() {
    let first = spend_tx(b"pay bob", shared_input());
    let second = spend_tx(b"pay carol", shared_input());
    let mut cluster = Cluster::new(&[0, 1, 2], &[first.clone(), second.clone()], ConsensusOptions::default());
    let now = GENESIS_TIME + 15;
    cluster.start(now);
    cluster.fire_timers(now);
    cluster.pump(now);

    let block = cluster.node(0).committed().expect("block committed").clone();
    assert_eq!(block.transactions.len(), 2);
    let included = block.transactions[1].hash();
    assert!(included == first.hash() || included == second.hash());
    for i in [1, 2] {
        assert_eq!(cluster.node(i).committed().map(Block::hash), Some(block.hash()), "node {i}");
    }
}

#[test]
fn proposal_spending_an_output_twice_triggers_change_view() {
    let first = spend_tx(b"pay bob", shared_input());
    let second = spend_tx(b"pay carol", shared_input());
    let mut cluster = Cluster::new(&[0], &[first.clone(), second.clone()], ConsensusOptions::default());
    let now = GENESIS_TIME + 15;
    cluster.start(now);
    let keys = cluster.keys.clone();

    cluster.deliver(0, proposal(&keys, 1, 0, &[first, second], now), now);

    let node = cluster.node(0);
    assert_eq!(node.ctx().phase, ConsensusPhase::ViewChanging);
    assert!(node.ctx().signatures[0].is_none());
    assert_eq!(change_views(&node.outbox()).len(), 1);
}

#[test]
fn messages_beyond_the_future_view_bound_are_never_replayed() {
    let bounded = ConsensusOptions {
        max_future_views: 1,
        ..ConsensusOptions::default()
    };
    for (options, replayed) in [(bounded, false), (ConsensusOptions::default(), true)] {
        let mut cluster = Cluster::new(&[0], &[], options);
        let now = GENESIS_TIME + 15;
        cluster.start(now);
        let keys = cluster.keys.clone();

        // view 2 at height 1 belongs to validator 3
        cluster.deliver(0, proposal(&keys, 3, 2, &[], now), now);
        assert!(!cluster.node(0).ctx().has_proposal());

        for from in [1, 2, 3] {
            cluster.deliver(0, change_view_to(&keys, from, 2, now), now);
        }
        let ctx = cluster.node(0).ctx();
        assert_eq!(ctx.view_number, 2);
        assert_eq!(ctx.has_proposal(), replayed);
    }
}

#[test]
fn future_view_buffers_are_capped_and_skipped_views_discarded() {
    let options = ConsensusOptions {
        max_buffered_per_view: 2,
        ..ConsensusOptions::default()
    };
    let mut cluster = Cluster::new(&[0], &[], options);
    let now = GENESIS_TIME + 15;
    cluster.start(now);
    let keys = cluster.keys.clone();

    // three responses for view 2 against a cap of two, one for view 1
    for from in [1, 2, 3] {
        cluster.deliver(0, response(&keys, from, 2, now), now);
    }
    cluster.deliver(0, response(&keys, 3, 1, now), now);
    assert!(cluster.node(0).ctx().stashed_responses.is_empty());

    // jump straight to view 2; the view-1 buffer is dropped
    for from in [1, 2, 3] {
        cluster.deliver(0, change_view_to(&keys, from, 2, now), now);
    }
    let ctx = cluster.node(0).ctx();
    assert_eq!(ctx.view_number, 2);
    let mut stashed: Vec<usize> = ctx.stashed_responses.keys().copied().collect();
    stashed.sort_unstable();
    assert_eq!(stashed, vec![1, 2]);
}
