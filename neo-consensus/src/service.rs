//! Consensus service - the dBFT round state machine.
//!
//! The service is synchronous and owns its [`ConsensusContext`]. Inputs are
//! inbound payloads, timer expiry, newly received transactions and persisted
//! blocks; every input carries the current Unix time in seconds. Outputs are
//! [`ConsensusEvent`]s pushed without blocking into a channel.
//!
//! Inbound messages that are malformed, stale, addressed to another round or
//! badly signed are logged and dropped. Only local failures (signing, the
//! ledger, a closed event channel) surface as errors.

use crate::context::{ConsensusContext, ConsensusPhase};
use crate::{ConsensusError, ConsensusMessage, ConsensusPayload, ConsensusResult, Ledger};
use neo_core::multisig::{consensus_address, create_multisig_witness};
use neo_core::{
    Block, Header, Input, MerkleTree, Transaction, Witness, MAX_TRANSACTIONS_PER_BLOCK, MAX_VALIDATORS,
};
use neo_crypto::{ECPoint, KeyPair, Signature};
use neo_primitives::UInt256;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// How far a proposal timestamp may run ahead of local time.
const MAX_FUTURE_SECONDS: u64 = 10 * 60;

const HEADER_VERSION: u32 = 0;

/// Timing and bounds of the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusOptions {
    /// Payload version; payloads with another version are dropped.
    pub version: u32,
    pub seconds_per_block: u64,
    pub max_transactions_per_block: usize,
    /// Views ahead of the current one whose messages are buffered.
    pub max_future_views: u8,
    pub max_buffered_per_view: usize,
    /// Entering this view (or a later one) raises [`ConsensusEvent::ViewChangeStalled`].
    pub view_change_alert_threshold: u8,
}

impl Default for ConsensusOptions {
    fn default() -> Self {
        Self {
            version: 0,
            seconds_per_block: 15,
            max_transactions_per_block: MAX_TRANSACTIONS_PER_BLOCK,
            max_future_views: 8,
            max_buffered_per_view: 64,
            view_change_alert_threshold: 6,
        }
    }
}

/// Events emitted by the consensus service
#[derive(Debug, Clone)]
pub enum ConsensusEvent {
    /// Need to broadcast a message
    BroadcastMessage(ConsensusPayload),
    /// A quorum signed the block; it carries its multi-signature witness.
    BlockCommitted(Block),
    /// View has changed
    ViewChanged {
        block_index: u32,
        old_view: u8,
        new_view: u8,
    },
    /// The round keeps failing to reach agreement.
    ViewChangeStalled { block_index: u32, view: u8 },
    /// Transactions listed in the accepted proposal that the pool lacks.
    RequestTransactions {
        block_index: u32,
        hashes: Vec<UInt256>,
    },
}

/// `seconds_per_block << (view + 1)`, saturating.
pub fn view_timeout(seconds_per_block: u64, view: u8) -> u64 {
    1u64.checked_shl(u32::from(view) + 1)
        .map_or(u64::MAX, |factor| seconds_per_block.saturating_mul(factor))
}

/// The dBFT state machine for one validator.
pub struct ConsensusService<L: ?Sized> {
    context: ConsensusContext,
    options: ConsensusOptions,
    key_pair: KeyPair,
    ledger: Arc<L>,
    event_tx: mpsc::Sender<ConsensusEvent>,
    /// Messages for views ahead of the current one.
    future: BTreeMap<u8, Vec<ConsensusPayload>>,
    running: bool,
}

impl<L: Ledger + ?Sized> ConsensusService<L> {
    /// Creates a service whose first round follows `tip`.
    pub fn new(
        options: ConsensusOptions,
        key_pair: KeyPair,
        validators: Vec<ECPoint>,
        ledger: Arc<L>,
        event_tx: mpsc::Sender<ConsensusEvent>,
        tip: &Header,
    ) -> ConsensusResult<Self> {
        if validators.is_empty() || validators.len() > MAX_VALIDATORS {
            return Err(ConsensusError::invalid_config(format!(
                "validator count {} outside 1..={MAX_VALIDATORS}",
                validators.len()
            )));
        }
        if options.seconds_per_block == 0 {
            return Err(ConsensusError::invalid_config("seconds_per_block must be positive"));
        }
        if !(1..=MAX_TRANSACTIONS_PER_BLOCK).contains(&options.max_transactions_per_block) {
            return Err(ConsensusError::invalid_config(format!(
                "max_transactions_per_block {} outside 1..={MAX_TRANSACTIONS_PER_BLOCK}",
                options.max_transactions_per_block
            )));
        }
        let my_index = validators
            .iter()
            .position(|key| *key == key_pair.public_key())
            .ok_or(ConsensusError::NotValidator)?;

        Ok(Self {
            context: ConsensusContext::new(options.version, tip, validators, my_index),
            options,
            key_pair,
            ledger,
            event_tx,
            future: BTreeMap::new(),
            running: false,
        })
    }

    /// Arms the timer of the current round.
    pub fn start(&mut self, now: u64) -> ConsensusResult<()> {
        info!(
            block_index = self.context.block_index,
            validators = self.context.validator_count(),
            my_index = self.context.my_index,
            "Starting consensus"
        );
        self.running = true;
        self.arm_view_timer(now);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.context.deadline = None;
    }

    /// Returns the current context (for testing/debugging)
    pub fn context(&self) -> &ConsensusContext {
        &self.context
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Unix seconds at which [`ConsensusService::on_timer`] should run next.
    pub fn deadline(&self) -> Option<u64> {
        self.context.deadline
    }

    /// Handles an inbound payload.
    pub fn process_message(&mut self, payload: ConsensusPayload, now: u64) -> ConsensusResult<()> {
        if !self.running || self.context.is_committed() {
            return Ok(());
        }

        let ctx = &self.context;
        let index = usize::from(payload.validator_index);
        if payload.version != ctx.version
            || payload.previous_hash != ctx.previous_hash
            || payload.block_index != ctx.block_index
        {
            debug!(
                block_index = ctx.block_index,
                payload_block = payload.block_index,
                validator = index,
                "Dropping payload for another round"
            );
            return Ok(());
        }
        if index >= ctx.validator_count() || index == ctx.my_index {
            debug!(validator = index, "Dropping payload with unusable validator index");
            return Ok(());
        }
        if !payload.verify(&ctx.validators[index]) {
            warn!(validator = index, "Dropping payload with invalid signature");
            return Ok(());
        }

        let message = match payload.message() {
            Ok(message) => message,
            Err(err) => {
                warn!(validator = index, %err, "Dropping malformed consensus message");
                return Ok(());
            }
        };

        if let ConsensusMessage::ChangeView {
            new_view_number, ..
        } = message
        {
            return self.on_change_view(index, new_view_number, now);
        }

        let view = message.view_number();
        let current = ctx.view_number;
        if view < current {
            debug!(
                validator = index,
                view,
                current,
                msg_type = %message.message_type(),
                "Dropping message for stale view"
            );
            return Ok(());
        }
        if view > current {
            self.buffer_future(view, payload);
            return Ok(());
        }

        match message {
            ConsensusMessage::PrepareRequest { .. } => {
                self.on_prepare_request(index, payload.timestamp, message, now)
            }
            ConsensusMessage::PrepareResponse { signature, .. } => {
                self.on_prepare_response(index, signature)
            }
            ConsensusMessage::ChangeView { .. } => Ok(()),
        }
    }

    /// Fires the round timer if its deadline has passed.
    pub fn on_timer(&mut self, now: u64) -> ConsensusResult<()> {
        if !self.running {
            return Ok(());
        }
        match self.context.deadline {
            Some(deadline) if now >= deadline => {}
            _ => return Ok(()),
        }
        self.context.deadline = None;

        if self.context.is_committed() {
            return Ok(());
        }
        if self.context.is_primary() && self.context.phase == ConsensusPhase::Idle {
            return self.send_prepare_request(now);
        }
        self.request_change_view(now)
    }

    /// Supplies a transaction the accepted proposal was waiting for.
    pub fn on_transaction_received(&mut self, transaction: Transaction, now: u64) -> ConsensusResult<()> {
        if !self.running {
            return Ok(());
        }
        self.add_transaction(transaction, true, now)
    }

    /// Discards the round once the chain reaches its height and opens the
    /// round for the next block.
    pub fn on_block_persisted(&mut self, header: &Header, now: u64) -> ConsensusResult<()> {
        if header.index < self.context.block_index {
            debug!(
                block_index = self.context.block_index,
                persisted = header.index,
                "Ignoring persisted block below the current round"
            );
            return Ok(());
        }

        info!(
            block_index = header.index,
            hash = %header.hash(),
            view = self.context.view_number,
            committed = self.context.is_committed(),
            "Block persisted, starting next round"
        );

        let validators = self.context.validators.clone();
        let my_index = self.context.my_index;
        self.context = ConsensusContext::new(self.options.version, header, validators, my_index);
        self.future.clear();
        if self.running {
            self.arm_view_timer(now);
        }
        Ok(())
    }

    fn arm_view_timer(&mut self, now: u64) {
        let ctx = &mut self.context;
        let wait = if ctx.is_primary() {
            let elapsed = now.saturating_sub(u64::from(ctx.previous_timestamp));
            self.options.seconds_per_block.saturating_sub(elapsed)
        } else {
            view_timeout(self.options.seconds_per_block, ctx.view_number)
        };
        ctx.deadline = Some(now.saturating_add(wait));
        debug!(
            block_index = ctx.block_index,
            view = ctx.view_number,
            primary = ctx.primary_index(),
            wait,
            "Timer armed"
        );
    }

    fn buffer_future(&mut self, view: u8, payload: ConsensusPayload) {
        let ahead = view - self.context.view_number;
        if ahead > self.options.max_future_views {
            debug!(view, ahead, "Dropping message too far ahead");
            return;
        }
        let queue = self.future.entry(view).or_default();
        if queue.len() >= self.options.max_buffered_per_view {
            debug!(view, "Future view buffer full, dropping message");
            return;
        }
        debug!(view, validator = payload.validator_index, "Buffering message for future view");
        queue.push(payload);
    }

    fn send_prepare_request(&mut self, now: u64) -> ConsensusResult<()> {
        let max_pool = self.options.max_transactions_per_block.saturating_sub(1);
        let pool = self.ledger.pool_transactions(max_pool)?;

        let nonce: u64 = rand::random();
        let mut transactions = vec![Transaction::miner(nonce as u32)];
        let mut seen: HashSet<UInt256> = transactions.iter().map(Transaction::hash).collect();
        let mut spent: HashSet<Input> = HashSet::new();
        for tx in pool {
            if transactions.len() > max_pool {
                break;
            }
            if tx.is_miner() || seen.contains(&tx.hash()) {
                continue;
            }
            if tx.inputs.iter().any(|input| spent.contains(input)) {
                debug!(hash = %tx.hash(), "Leaving out pool transaction with a claimed input");
                continue;
            }
            seen.insert(tx.hash());
            spent.extend(tx.inputs.iter().copied());
            transactions.push(tx);
        }
        let transaction_hashes: Vec<UInt256> = transactions.iter().map(Transaction::hash).collect();

        let validators = self.ledger.next_validators(&transactions)?;
        let next_consensus = consensus_address(&validators)?;

        let ctx = &self.context;
        let now_seconds = u32::try_from(now).unwrap_or(u32::MAX);
        let header = Header {
            version: HEADER_VERSION,
            previous_hash: ctx.previous_hash,
            merkle_root: MerkleTree::compute_root(&transaction_hashes),
            timestamp: now_seconds.max(ctx.previous_timestamp.saturating_add(1)),
            index: ctx.block_index,
            consensus_data: nonce,
            next_consensus,
            witness: Witness::default(),
        };
        let signature = self.key_pair.sign(&header.unsigned_data())?;

        info!(
            block_index = ctx.block_index,
            view = ctx.view_number,
            transactions = transactions.len(),
            "Sending PrepareRequest"
        );

        let message = ConsensusMessage::PrepareRequest {
            view_number: ctx.view_number,
            nonce,
            next_consensus,
            transaction_hashes: transaction_hashes.clone(),
            miner_transaction: transactions[0].clone(),
            signature,
        };
        let timestamp = header.timestamp;

        let ctx = &mut self.context;
        let my_index = ctx.my_index;
        ctx.signatures[my_index] = Some(signature);
        ctx.header = Some(header);
        ctx.transaction_hashes = transaction_hashes;
        ctx.transactions = transactions.into_iter().map(|tx| (tx.hash(), tx)).collect();
        ctx.phase = ConsensusPhase::RequestSent;
        ctx.deadline = Some(now.saturating_add(view_timeout(
            self.options.seconds_per_block,
            ctx.view_number,
        )));

        self.broadcast(&message, timestamp)?;
        self.check_signatures()
    }

    fn on_prepare_request(
        &mut self,
        index: usize,
        timestamp: u32,
        message: ConsensusMessage,
        now: u64,
    ) -> ConsensusResult<()> {
        let ConsensusMessage::PrepareRequest {
            nonce,
            next_consensus,
            transaction_hashes,
            miner_transaction,
            signature,
            ..
        } = message
        else {
            return Ok(());
        };

        let ctx = &mut self.context;
        if ctx.is_primary() || ctx.has_proposal() {
            debug!(validator = index, "Ignoring PrepareRequest");
            return Ok(());
        }
        if index != ctx.primary_index() {
            debug!(
                validator = index,
                primary = ctx.primary_index(),
                "Ignoring PrepareRequest from non-primary"
            );
            return Ok(());
        }
        if u64::from(timestamp) > now.saturating_add(MAX_FUTURE_SECONDS)
            || timestamp <= ctx.previous_timestamp
        {
            warn!(
                validator = index,
                timestamp,
                previous = ctx.previous_timestamp,
                "Ignoring PrepareRequest with out-of-range timestamp"
            );
            return Ok(());
        }

        let header = Header {
            version: HEADER_VERSION,
            previous_hash: ctx.previous_hash,
            merkle_root: MerkleTree::compute_root(&transaction_hashes),
            timestamp,
            index: ctx.block_index,
            consensus_data: nonce,
            next_consensus,
            witness: Witness::default(),
        };
        let signed = header.unsigned_data();
        if !signature.verify(&signed, &ctx.validators[index]) {
            warn!(validator = index, "PrepareRequest signature verification failed");
            return Ok(());
        }

        info!(
            block_index = ctx.block_index,
            view = ctx.view_number,
            primary = index,
            transactions = transaction_hashes.len(),
            "Received PrepareRequest"
        );

        ctx.header = Some(header);
        ctx.transaction_hashes = transaction_hashes;
        ctx.signatures[index] = Some(signature);
        ctx.phase = ConsensusPhase::RequestReceived;

        let stashed: Vec<(usize, Signature)> = ctx.stashed_responses.drain().collect();
        for (validator, stashed_signature) in stashed {
            if stashed_signature.verify(&signed, &ctx.validators[validator]) {
                ctx.signatures[validator] = Some(stashed_signature);
            } else {
                warn!(validator, "Discarding stashed PrepareResponse with invalid signature");
            }
        }

        let listed: Vec<UInt256> = ctx.transaction_hashes.iter().skip(1).copied().collect();
        for hash in listed {
            if let Some(transaction) = self.ledger.pool_transaction(&hash)? {
                self.add_transaction(transaction, false, now)?;
                if self.context.phase != ConsensusPhase::RequestReceived {
                    return Ok(());
                }
            }
        }
        self.add_transaction(miner_transaction, true, now)?;

        if self.context.phase == ConsensusPhase::RequestReceived {
            let missing = self.context.missing_transactions();
            if !missing.is_empty() {
                debug!(missing = missing.len(), "Waiting for proposed transactions");
                self.send_event(ConsensusEvent::RequestTransactions {
                    block_index: self.context.block_index,
                    hashes: missing,
                })?;
            }
        }
        Ok(())
    }

    fn add_transaction(&mut self, transaction: Transaction, verify: bool, now: u64) -> ConsensusResult<()> {
        let hash = transaction.hash();
        let ctx = &self.context;
        if ctx.phase != ConsensusPhase::RequestReceived
            || ctx.transactions.contains_key(&hash)
            || !ctx.transaction_hashes.contains(&hash)
        {
            return Ok(());
        }

        if self.ledger.contains_transaction(&hash)? {
            warn!(%hash, "Proposed transaction is already persisted");
            return self.request_change_view(now);
        }
        if verify && !self.ledger.verify_transaction(&transaction)? {
            warn!(%hash, "Proposed transaction failed verification");
            return self.request_change_view(now);
        }
        if self.context.spends_any(&transaction.inputs) {
            warn!(%hash, "Proposed transaction spends an output another proposed transaction spends");
            return self.request_change_view(now);
        }

        self.context.transactions.insert(hash, transaction);
        if !self.context.has_all_transactions() {
            return Ok(());
        }

        let validators = self.ledger.next_validators(&self.context.ordered_transactions())?;
        let expected = consensus_address(&validators)?;
        let Some(header) = self.context.header.as_ref() else {
            return Ok(());
        };
        if header.next_consensus != expected {
            warn!(
                proposed = %header.next_consensus,
                %expected,
                "Proposal has wrong next consensus address"
            );
            return self.request_change_view(now);
        }

        let signature = self.key_pair.sign(&header.unsigned_data())?;
        let ctx = &mut self.context;
        let my_index = ctx.my_index;
        ctx.signatures[my_index] = Some(signature);
        ctx.phase = ConsensusPhase::ResponseWait;
        let view_number = ctx.view_number;
        debug!(block_index = ctx.block_index, view = view_number, "Sending PrepareResponse");

        self.broadcast(
            &ConsensusMessage::PrepareResponse {
                view_number,
                signature,
            },
            clamp_timestamp(now),
        )?;
        self.check_signatures()
    }

    fn on_prepare_response(&mut self, index: usize, signature: Signature) -> ConsensusResult<()> {
        let ctx = &mut self.context;
        if ctx.signatures[index].is_some() {
            return Ok(());
        }
        let Some(header) = ctx.header.as_ref() else {
            ctx.stashed_responses.entry(index).or_insert(signature);
            debug!(validator = index, "Stashed PrepareResponse received before PrepareRequest");
            return Ok(());
        };
        if !signature.verify(&header.unsigned_data(), &ctx.validators[index]) {
            warn!(validator = index, "PrepareResponse signature verification failed");
            return Ok(());
        }

        ctx.signatures[index] = Some(signature);
        debug!(
            block_index = ctx.block_index,
            validator = index,
            signatures = ctx.signature_count(),
            required = ctx.m(),
            "Received PrepareResponse"
        );
        self.check_signatures()
    }

    /// Assembles and hands over the block once a quorum signed it and every
    /// transaction is known.
    fn check_signatures(&mut self) -> ConsensusResult<()> {
        let ctx = &self.context;
        if ctx.is_committed() || ctx.signature_count() < ctx.m() || !ctx.has_all_transactions() {
            return Ok(());
        }
        let Some(header) = ctx.header.clone() else {
            return Ok(());
        };

        let m = ctx.m();
        let signatures: Vec<(ECPoint, Signature)> = ctx
            .validators
            .iter()
            .zip(&ctx.signatures)
            .filter_map(|(key, signature)| signature.map(|s| (*key, s)))
            .take(m)
            .collect();
        let witness = create_multisig_witness(m, &ctx.validators, &signatures)?;
        let block = Block::new(Header { witness, ..header }, ctx.ordered_transactions());

        info!(
            block_index = ctx.block_index,
            view = ctx.view_number,
            hash = %block.hash(),
            transactions = block.transactions.len(),
            signatures = signatures.len(),
            "Block committed"
        );

        self.context.phase = ConsensusPhase::Committed;
        self.context.deadline = None;
        self.send_event(ConsensusEvent::BlockCommitted(block))
    }

    fn on_change_view(&mut self, index: usize, new_view: u8, now: u64) -> ConsensusResult<()> {
        let ctx = &mut self.context;
        if new_view <= ctx.expected_view[index] {
            return Ok(());
        }
        ctx.expected_view[index] = new_view;
        debug!(
            block_index = ctx.block_index,
            validator = index,
            new_view,
            "Received ChangeView"
        );

        if new_view > ctx.view_number && ctx.check_expected_view(new_view) {
            return self.initialize_view(new_view, now);
        }
        Ok(())
    }

    fn request_change_view(&mut self, now: u64) -> ConsensusResult<()> {
        let ctx = &mut self.context;
        let my_index = ctx.my_index;
        let Some(new_view) = ctx.expected_view[my_index].checked_add(1) else {
            error!(block_index = ctx.block_index, "View number exhausted");
            return Ok(());
        };
        ctx.expected_view[my_index] = new_view;
        ctx.phase = ConsensusPhase::ViewChanging;
        let view_number = ctx.view_number;

        warn!(
            block_index = ctx.block_index,
            view = view_number,
            new_view,
            "Requesting view change"
        );

        self.broadcast(
            &ConsensusMessage::ChangeView {
                view_number,
                new_view_number: new_view,
            },
            clamp_timestamp(now),
        )?;

        if self.context.check_expected_view(new_view) {
            return self.initialize_view(new_view, now);
        }
        self.context.deadline = Some(now.saturating_add(view_timeout(
            self.options.seconds_per_block,
            new_view,
        )));
        Ok(())
    }

    fn initialize_view(&mut self, view: u8, now: u64) -> ConsensusResult<()> {
        let old_view = self.context.view_number;
        let block_index = self.context.block_index;
        self.context.reset_for_view(view);
        info!(
            block_index,
            old_view,
            new_view = view,
            primary = self.context.primary_index(),
            "Changing view"
        );

        self.send_event(ConsensusEvent::ViewChanged {
            block_index,
            old_view,
            new_view: view,
        })?;
        if view >= self.options.view_change_alert_threshold {
            error!(block_index, view, "Consensus is not reaching agreement");
            self.send_event(ConsensusEvent::ViewChangeStalled { block_index, view })?;
        }

        self.arm_view_timer(now);

        // drop buffers for skipped views, replay the one we reached
        self.future = self.future.split_off(&view);
        if let Some(queued) = self.future.remove(&view) {
            for payload in queued {
                self.process_message(payload, now)?;
            }
        }
        Ok(())
    }

    fn broadcast(&self, message: &ConsensusMessage, timestamp: u32) -> ConsensusResult<()> {
        let ctx = &self.context;
        let validator_index =
            u16::try_from(ctx.my_index).map_err(|_| ConsensusError::InvalidValidatorIndex(u16::MAX))?;
        let payload = ConsensusPayload::sign(
            ctx.version,
            ctx.previous_hash,
            ctx.block_index,
            validator_index,
            timestamp,
            message,
            &self.key_pair,
        )?;
        self.send_event(ConsensusEvent::BroadcastMessage(payload))
    }

    fn send_event(&self, event: ConsensusEvent) -> ConsensusResult<()> {
        self.event_tx
            .try_send(event)
            .map_err(|e| ConsensusError::ChannelError(e.to_string()))
    }
}

fn clamp_timestamp(now: u64) -> u32 {
    u32::try_from(now).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_core::multisig::verify_multisig_witness;
    use neo_primitives::UInt160;

    struct EmptyLedger {
        validators: Vec<ECPoint>,
    }

    impl Ledger for EmptyLedger {
        fn pool_transactions(&self, _max: usize) -> ConsensusResult<Vec<Transaction>> {
            Ok(Vec::new())
        }

        fn pool_transaction(&self, _hash: &UInt256) -> ConsensusResult<Option<Transaction>> {
            Ok(None)
        }

        fn contains_transaction(&self, _hash: &UInt256) -> ConsensusResult<bool> {
            Ok(false)
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
            timestamp: 1_000,
            index: 0,
            consensus_data: 0,
            next_consensus: UInt160::zero(),
            witness: Witness::default(),
        }
    }

    fn service(
        keys: &[KeyPair],
        me: usize,
    ) -> (ConsensusService<EmptyLedger>, mpsc::Receiver<ConsensusEvent>) {
        let validators: Vec<ECPoint> = keys.iter().map(KeyPair::public_key).collect();
        let ledger = Arc::new(EmptyLedger {
            validators: validators.clone(),
        });
        let (tx, rx) = mpsc::channel(64);
        let service = ConsensusService::new(
            ConsensusOptions::default(),
            keys[me].clone(),
            validators,
            ledger,
            tx,
            &genesis(),
        )
        .unwrap();
        (service, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ConsensusEvent>) -> Vec<ConsensusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn view_timeout_doubles_and_saturates() {
        assert_eq!(view_timeout(15, 0), 30);
        assert_eq!(view_timeout(15, 1), 60);
        assert_eq!(view_timeout(15, 3), 240);
        assert_eq!(view_timeout(15, 100), u64::MAX);
    }

    #[test]
    fn outsider_key_is_rejected() {
        let keys = vec![KeyPair::generate()];
        let validators = keys.iter().map(KeyPair::public_key).collect::<Vec<_>>();
        let (tx, _rx) = mpsc::channel(1);
        let result = ConsensusService::new(
            ConsensusOptions::default(),
            KeyPair::generate(),
            validators.clone(),
            Arc::new(EmptyLedger { validators }),
            tx,
            &genesis(),
        );
        assert!(matches!(result, Err(ConsensusError::NotValidator)));
    }

    #[test]
    fn block_size_above_the_decoder_limit_is_rejected() {
        let keys = vec![KeyPair::generate()];
        let validators = keys.iter().map(KeyPair::public_key).collect::<Vec<_>>();
        for max_transactions_per_block in [0, MAX_TRANSACTIONS_PER_BLOCK + 1] {
            let (tx, _rx) = mpsc::channel(1);
            let result = ConsensusService::new(
                ConsensusOptions {
                    max_transactions_per_block,
                    ..ConsensusOptions::default()
                },
                keys[0].clone(),
                validators.clone(),
                Arc::new(EmptyLedger {
                    validators: validators.clone(),
                }),
                tx,
                &genesis(),
            );
            assert!(
                matches!(result, Err(ConsensusError::InvalidConfig { .. })),
                "{max_transactions_per_block}"
            );
        }
    }

    #[test]
    fn single_validator_commits_alone() {
        let keys = vec![KeyPair::generate()];
        let (mut service, mut rx) = service(&keys, 0);
        let now = 1_015;
        service.start(now).unwrap();
        assert_eq!(service.deadline(), Some(now));

        service.on_timer(now).unwrap();
        assert_eq!(service.context().phase, ConsensusPhase::Committed);

        let events = drain(&mut rx);
        let block = events
            .iter()
            .find_map(|event| match event {
                ConsensusEvent::BlockCommitted(block) => Some(block.clone()),
                _ => None,
            })
            .expect("block committed");
        assert_eq!(block.index(), 1);
        assert_eq!(block.header.timestamp, 1_015);
        assert!(block.transactions[0].is_miner());
        assert!(verify_multisig_witness(
            &block.header.witness,
            &block.header.unsigned_data(),
            1,
            &[keys[0].public_key()],
        ));
    }

    #[test]
    fn primary_waits_out_remaining_block_time() {
        let keys: Vec<KeyPair> = (0..4).map(|_| KeyPair::generate()).collect();
        // height 1, view 0: validator 1 is primary
        let (mut primary, _rx) = service(&keys, 1);
        primary.start(1_005).unwrap();
        assert_eq!(primary.deadline(), Some(1_015));

        let (mut backup, _rx) = service(&keys, 0);
        backup.start(1_005).unwrap();
        assert_eq!(backup.deadline(), Some(1_005 + 30));
    }

    #[test]
    fn backup_timeout_requests_view_change() {
        let keys: Vec<KeyPair> = (0..4).map(|_| KeyPair::generate()).collect();
        let (mut backup, mut rx) = service(&keys, 0);
        backup.start(1_000).unwrap();
        backup.on_timer(1_029).unwrap();
        assert!(drain(&mut rx).is_empty());

        backup.on_timer(1_030).unwrap();
        let ctx = backup.context();
        assert_eq!(ctx.phase, ConsensusPhase::ViewChanging);
        assert_eq!(ctx.expected_view[0], 1);
        assert_eq!(ctx.view_number, 0);
        assert_eq!(backup.deadline(), Some(1_030 + 60));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        let ConsensusEvent::BroadcastMessage(payload) = &events[0] else {
            panic!("expected broadcast");
        };
        assert_eq!(payload.validator_index, 0);
        assert_eq!(
            payload.message().unwrap(),
            ConsensusMessage::ChangeView {
                view_number: 0,
                new_view_number: 1
            }
        );
    }

    #[test]
    fn persisted_block_opens_next_round() {
        let keys: Vec<KeyPair> = (0..4).map(|_| KeyPair::generate()).collect();
        let (mut service, _rx) = service(&keys, 0);
        service.start(1_000).unwrap();

        let mut next = genesis();
        next.index = 1;
        next.timestamp = 1_016;
        next.previous_hash = genesis().hash();
        service.on_block_persisted(&next, 1_016).unwrap();

        let ctx = service.context();
        assert_eq!(ctx.block_index, 2);
        assert_eq!(ctx.previous_hash, next.hash());
        assert_eq!(ctx.phase, ConsensusPhase::Idle);
        // height 2, view 0: validator 2 is primary, so we wait as a backup
        assert_eq!(service.deadline(), Some(1_016 + 30));

        service.on_block_persisted(&genesis(), 1_017).unwrap();
        assert_eq!(service.context().block_index, 2);
    }
}
