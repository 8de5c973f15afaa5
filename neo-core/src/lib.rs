//! # Neo Core
//!
//! Ledger entities shared by the storage engine and consensus:
//!
//! - [`Block`], [`Header`], [`Witness`]
//! - [`Transaction`] with its [`Input`]s and [`Output`]s, including the
//!   per-block miner transaction
//! - persisted state records under [`state`]: accounts, unspent/unclaimed
//!   inputs, actions, assets, contracts, storage items, validators and the
//!   per-block/per-transaction bookkeeping
//!
//! Every entity implements [`neo_io::Serializable`]; the encoding is what the
//! storage engine persists and what consensus signs.

pub mod block;
pub mod error;
pub mod header;
pub mod merkle;
pub mod multisig;
pub mod state;
pub mod transaction;
pub mod witness;

pub use block::Block;
pub use error::{LedgerError, LedgerResult};
pub use header::Header;
pub use merkle::MerkleTree;
pub use state::{
    Account, AccountInput, Action, ActionKind, Asset, BlockData, Contract, InvocationData,
    StorageItem, TransactionData, Validator, ValidatorsCount,
};
pub use transaction::{
    Attribute, Input, Output, Transaction, TransactionKind, TransactionType,
};
pub use witness::Witness;

/// Maximum transactions accepted in a single block.
pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 500;

/// Largest validator set a multi-signature contract can cover.
pub const MAX_VALIDATORS: usize = 1024;

/// Maximum size of an invocation or verification script.
pub const MAX_SCRIPT_SIZE: usize = 65_536;
