//! # Neo Node
//!
//! The node binary's library half: the [`Blockchain`] orchestrator that
//! persists finalized blocks through the cached storage façade, the
//! [`MemoryPool`] proposals draw from, and the runtime wiring consensus to
//! both.

pub mod blockchain;
pub mod error;
pub mod logging;
pub mod mempool;
pub mod node;

pub use blockchain::{genesis_block, Blockchain, ChainStorage, DEFAULT_POOL_CAPACITY};
pub use error::{ChainError, ChainResult};
pub use logging::init_tracing;
pub use mempool::MemoryPool;
pub use node::{consensus_options, open_storage, parse_validators, run, run_consensus, NodeStorage};
