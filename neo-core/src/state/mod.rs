//! Persisted ledger state records.

mod account;
mod action;
mod asset;
mod bookkeeping;
mod contract;
mod validator;

pub use account::{Account, AccountInput};
pub use action::{Action, ActionKind};
pub use asset::Asset;
pub use bookkeeping::{BlockData, InvocationData, TransactionData};
pub use contract::{Contract, StorageItem};
pub use validator::{Validator, ValidatorsCount};

pub(crate) const MAX_STRING: usize = 1024;
