//! # Neo Consensus
//!
//! Delegated Byzantine Fault Tolerance (dBFT) consensus for a Neo 2.x style
//! chain.
//!
//! ## Algorithm Overview
//!
//! - A fixed validator set of `n` nodes tolerates `f = (n-1)/3` faulty nodes
//! - The primary of a round is `(height + view) mod n`
//! - A block is final once `n - f` validators signed the same header
//! - A stuck round moves to the next view once `n - f` validators ask for it
//!
//! ## Core Types
//!
//! - [`ConsensusMessageType`]: ChangeView, PrepareRequest, PrepareResponse
//! - [`ConsensusMessage`]: the decoded message body
//! - [`ConsensusPayload`]: the signed envelope carried over the network
//! - [`ConsensusContext`]: per-round state
//! - [`ConsensusService`]: the state machine
//! - [`ConsensusRunner`]: tokio driver feeding the service commands and timers
//!
//! ## Consensus Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    dBFT Consensus Flow                       │
//! │                                                              │
//! │  Primary                    Backups                          │
//! │    │                           │                             │
//! │    │──── PrepareRequest ──────>│  (header signature)         │
//! │    │                           │                             │
//! │    │<─── PrepareResponse ──────│  (header signature)         │
//! │    │                           │                             │
//! │    │   n - f signatures: block assembled with its witness    │
//! │    ▼                           ▼                             │
//! │                                                              │
//! │  Timeout ──> ChangeView ──> n - f agree ──> next view        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use neo_consensus::{view_timeout, ConsensusMessageType};
//!
//! let msg_type = ConsensusMessageType::from_byte(0x20);
//! assert_eq!(msg_type, Some(ConsensusMessageType::PrepareRequest));
//!
//! // backups wait twice as long after every failed view
//! assert_eq!(view_timeout(15, 0), 30);
//! assert_eq!(view_timeout(15, 1), 60);
//! ```

pub mod context;
pub mod error;
pub mod ledger;
pub mod message;
pub mod message_type;
pub mod payload;
pub mod runner;
pub mod service;

// Re-exports
pub use context::{ConsensusContext, ConsensusPhase, Role};
pub use error::{ConsensusError, ConsensusResult};
pub use ledger::Ledger;
pub use message::ConsensusMessage;
pub use message_type::ConsensusMessageType;
pub use payload::ConsensusPayload;
pub use runner::{unix_now, ConsensusCommand, ConsensusRunner};
pub use service::{view_timeout, ConsensusEvent, ConsensusOptions, ConsensusService};
