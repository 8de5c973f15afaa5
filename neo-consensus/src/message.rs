//! Consensus messages and their wire encoding.
//!
//! Every message starts with `type: u8, view_number: u8`, followed by the
//! variant fields:
//!
//! | Type | Fields |
//! |------|--------|
//! | `ChangeView` (0x00) | `new_view_number: u8` |
//! | `PrepareRequest` (0x20) | `nonce: u64`, `next_consensus: UInt160`, `transaction_hashes: var-array<UInt256>`, `miner_transaction`, `signature: [u8; 64]` |
//! | `PrepareResponse` (0x21) | `signature: [u8; 64]` |
//!
//! Decoding validates as it reads, so an invalid message never exists as a
//! value.

use crate::{ConsensusError, ConsensusMessageType, ConsensusResult};
use neo_core::{Transaction, MAX_TRANSACTIONS_PER_BLOCK};
use neo_crypto::{Signature, SIGNATURE_SIZE};
use neo_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use neo_primitives::{UInt160, UInt256};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusMessage {
    ChangeView {
        view_number: u8,
        /// Never zero.
        new_view_number: u8,
    },
    PrepareRequest {
        view_number: u8,
        nonce: u64,
        next_consensus: UInt160,
        /// Unique; the first entry is the miner transaction's hash.
        transaction_hashes: Vec<UInt256>,
        miner_transaction: Transaction,
        /// The primary's signature over the proposed header.
        signature: Signature,
    },
    PrepareResponse {
        view_number: u8,
        signature: Signature,
    },
}

impl ConsensusMessage {
    pub fn message_type(&self) -> ConsensusMessageType {
        match self {
            Self::ChangeView { .. } => ConsensusMessageType::ChangeView,
            Self::PrepareRequest { .. } => ConsensusMessageType::PrepareRequest,
            Self::PrepareResponse { .. } => ConsensusMessageType::PrepareResponse,
        }
    }

    pub fn view_number(&self) -> u8 {
        match self {
            Self::ChangeView { view_number, .. }
            | Self::PrepareRequest { view_number, .. }
            | Self::PrepareResponse { view_number, .. } => *view_number,
        }
    }

    /// Decodes one message from `reader`.
    ///
    /// The type byte is peeked on a clone of the reader; the variant decoder
    /// then reads the common header itself.
    pub fn decode(reader: &mut MemoryReader) -> ConsensusResult<Self> {
        let tag = reader.clone().read_u8()?;
        let message_type =
            ConsensusMessageType::from_byte(tag).ok_or(ConsensusError::InvalidMessageType(tag))?;

        match message_type {
            ConsensusMessageType::ChangeView => {
                let view_number = read_header(reader)?;
                let new_view_number = reader.read_u8()?;
                if new_view_number == 0 {
                    return Err(ConsensusError::format("newViewNumber", "must be nonzero"));
                }
                Ok(Self::ChangeView {
                    view_number,
                    new_view_number,
                })
            }
            ConsensusMessageType::PrepareRequest => {
                let view_number = read_header(reader)?;
                let nonce = reader.read_u64()?;
                let next_consensus = reader.read_uint160()?;
                let transaction_hashes =
                    reader.read_array_with(MAX_TRANSACTIONS_PER_BLOCK, |r| r.read_uint256())?;
                let unique: HashSet<_> = transaction_hashes.iter().collect();
                if unique.len() != transaction_hashes.len() {
                    return Err(ConsensusError::format(
                        "transactionHashes",
                        "contains duplicate hashes",
                    ));
                }
                let miner_transaction = Transaction::deserialize(reader)?;
                if !miner_transaction.is_miner() {
                    return Err(ConsensusError::format(
                        "minerTransaction",
                        format!("expected a miner transaction, got {:?}", miner_transaction.tx_type()),
                    ));
                }
                let miner_hash = miner_transaction.hash();
                match transaction_hashes.first() {
                    Some(first) if *first == miner_hash => {}
                    Some(first) => {
                        return Err(ConsensusError::format(
                            "transactionHashes",
                            format!("first hash {first} does not match miner transaction {miner_hash}"),
                        ))
                    }
                    None => {
                        return Err(ConsensusError::format("transactionHashes", "is empty"));
                    }
                }
                let signature = Signature::deserialize(reader)?;
                Ok(Self::PrepareRequest {
                    view_number,
                    nonce,
                    next_consensus,
                    transaction_hashes,
                    miner_transaction,
                    signature,
                })
            }
            ConsensusMessageType::PrepareResponse => {
                let view_number = read_header(reader)?;
                let signature = Signature::deserialize(reader)?;
                Ok(Self::PrepareResponse {
                    view_number,
                    signature,
                })
            }
        }
    }

    /// Decodes a complete buffer; trailing bytes are an error.
    pub fn from_bytes(data: &[u8]) -> ConsensusResult<Self> {
        let mut reader = MemoryReader::new(data);
        let message = Self::decode(&mut reader)?;
        reader.ensure_end()?;
        Ok(message)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(self.size());
        self.serialize(&mut writer);
        writer.into_bytes()
    }
}

/// Re-reads `type, view_number` and returns the view.
fn read_header(reader: &mut MemoryReader) -> IoResult<u8> {
    reader.read_u8()?;
    reader.read_u8()
}

impl Serializable for ConsensusMessage {
    fn size(&self) -> usize {
        2 + match self {
            Self::ChangeView { .. } => 1,
            Self::PrepareRequest {
                transaction_hashes,
                miner_transaction,
                ..
            } => {
                8 + 20
                    + helper::get_array_size(transaction_hashes)
                    + miner_transaction.size()
                    + SIGNATURE_SIZE
            }
            Self::PrepareResponse { .. } => SIGNATURE_SIZE,
        }
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.message_type().to_byte());
        writer.write_u8(self.view_number());
        match self {
            Self::ChangeView {
                new_view_number, ..
            } => writer.write_u8(*new_view_number),
            Self::PrepareRequest {
                nonce,
                next_consensus,
                transaction_hashes,
                miner_transaction,
                signature,
                ..
            } => {
                writer.write_u64(*nonce);
                writer.write_uint160(next_consensus);
                writer.write_array_with(transaction_hashes, |w, hash| w.write_uint256(hash));
                miner_transaction.serialize(writer);
                signature.serialize(writer);
            }
            Self::PrepareResponse { signature, .. } => signature.serialize(writer),
        }
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Self::decode(reader).map_err(|e| match e {
            ConsensusError::Io(io) => io,
            other => IoError::invalid_data(other.to_string()),
        })
    }
}
