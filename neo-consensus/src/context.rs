//! Consensus context - the state of one round.
//!
//! A round is created when the previous block is persisted and discarded
//! when the next one is. Views inside a round reset the proposal and its
//! signatures but keep the expected-view vector.

use neo_core::{Header, Input, Transaction};
use neo_crypto::{ECPoint, Signature};
use neo_primitives::UInt256;
use std::collections::HashMap;

/// Where the local node is inside the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsensusPhase {
    /// Waiting for the proposal timer (primary) or a PrepareRequest (backup).
    #[default]
    Idle,
    /// Primary: PrepareRequest broadcast, collecting responses.
    RequestSent,
    /// Backup: PrepareRequest accepted, waiting for listed transactions.
    RequestReceived,
    /// Backup: PrepareResponse broadcast, collecting responses.
    ResponseWait,
    /// Quorum reached; the block has been handed to the ledger. Terminal:
    /// the round is replaced once the ledger persists a block at its height.
    Committed,
    /// Our ChangeView was sent and the view has not moved yet.
    ViewChanging,
}

/// Role of the local node in the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Backup,
}

/// Consensus context holding all state for the current round.
#[derive(Debug)]
pub struct ConsensusContext {
    pub version: u32,
    pub previous_hash: UInt256,
    /// Timestamp of the previous block, seconds.
    pub previous_timestamp: u32,
    /// Height being agreed on.
    pub block_index: u32,
    pub view_number: u8,
    pub validators: Vec<ECPoint>,
    pub my_index: usize,
    pub phase: ConsensusPhase,
    /// Highest view each validator has asked for.
    pub expected_view: Vec<u8>,
    /// Header signatures by validator index.
    pub signatures: Vec<Option<Signature>>,
    /// Proposed header, known once a PrepareRequest is sent or accepted.
    pub header: Option<Header>,
    pub transaction_hashes: Vec<UInt256>,
    pub transactions: HashMap<UInt256, Transaction>,
    /// PrepareResponses that arrived before the PrepareRequest.
    pub stashed_responses: HashMap<usize, Signature>,
    /// Unix seconds at which the round timer fires.
    pub deadline: Option<u64>,
}

impl ConsensusContext {
    /// Opens the round that follows `previous`.
    pub fn new(version: u32, previous: &Header, validators: Vec<ECPoint>, my_index: usize) -> Self {
        let n = validators.len();
        Self {
            version,
            previous_hash: previous.hash(),
            previous_timestamp: previous.timestamp,
            block_index: previous.index + 1,
            view_number: 0,
            validators,
            my_index,
            phase: ConsensusPhase::Idle,
            expected_view: vec![0; n],
            signatures: vec![None; n],
            header: None,
            transaction_hashes: Vec::new(),
            transactions: HashMap::new(),
            stashed_responses: HashMap::new(),
            deadline: None,
        }
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Faulty validators tolerated: f = (n - 1) / 3.
    pub fn f(&self) -> usize {
        (self.validator_count().saturating_sub(1)) / 3
    }

    /// Signatures required: M = n - f.
    pub fn m(&self) -> usize {
        self.validator_count() - self.f()
    }

    /// Primary of `view`: (height + view) mod n.
    pub fn primary_index_for(&self, view: u8) -> usize {
        (self.block_index as usize + view as usize) % self.validator_count()
    }

    pub fn primary_index(&self) -> usize {
        self.primary_index_for(self.view_number)
    }

    pub fn role(&self) -> Role {
        if self.is_primary() {
            Role::Primary
        } else {
            Role::Backup
        }
    }

    pub fn is_primary(&self) -> bool {
        self.my_index == self.primary_index()
    }

    pub fn is_backup(&self) -> bool {
        !self.is_primary()
    }

    pub fn is_committed(&self) -> bool {
        self.phase == ConsensusPhase::Committed
    }

    /// True once a proposal has been sent or accepted in this view.
    pub fn has_proposal(&self) -> bool {
        self.header.is_some()
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.iter().filter(|s| s.is_some()).count()
    }

    /// Listed transactions not yet available.
    pub fn missing_transactions(&self) -> Vec<UInt256> {
        self.transaction_hashes
            .iter()
            .filter(|hash| !self.transactions.contains_key(hash))
            .copied()
            .collect()
    }

    pub fn has_all_transactions(&self) -> bool {
        !self.transaction_hashes.is_empty()
            && self
                .transaction_hashes
                .iter()
                .all(|hash| self.transactions.contains_key(hash))
    }

    /// True when an accepted proposal transaction already spends one of `inputs`.
    pub fn spends_any(&self, inputs: &[Input]) -> bool {
        self.transactions
            .values()
            .flat_map(|tx| &tx.inputs)
            .any(|spent| inputs.contains(spent))
    }

    /// Proposed transactions in listed order.
    pub fn ordered_transactions(&self) -> Vec<Transaction> {
        self.transaction_hashes
            .iter()
            .filter_map(|hash| self.transactions.get(hash).cloned())
            .collect()
    }

    /// True when a quorum of validators expects `view` and we are not there.
    pub fn check_expected_view(&self, view: u8) -> bool {
        self.view_number != view
            && self.expected_view.iter().filter(|v| **v == view).count() >= self.m()
    }

    /// Moves to `view`, dropping the proposal and its signatures.
    pub fn reset_for_view(&mut self, view: u8) {
        self.view_number = view;
        self.phase = ConsensusPhase::Idle;
        self.signatures = vec![None; self.validator_count()];
        self.header = None;
        self.transaction_hashes.clear();
        self.transactions.clear();
        self.stashed_responses.clear();
        self.deadline = None;
        let my_index = self.my_index;
        if self.expected_view[my_index] < view {
            self.expected_view[my_index] = view;
        }
    }
}
