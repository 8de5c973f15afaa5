//! # Neo Primitives
//!
//! Fixed-width hash types shared by every other crate in the workspace:
//!
//! - [`UInt160`]: 160-bit script hashes (accounts, contracts, consensus addresses)
//! - [`UInt256`]: 256-bit hashes (blocks, headers, transactions, assets)
//!
//! Both store their bytes little-endian, exactly as they appear on the wire
//! and in storage keys. `Display` renders the conventional big-endian hex form
//! prefixed with `0x`.
//!
//! ## Example
//!
//! ```rust
//! use neo_primitives::{UInt160, UInt256};
//!
//! let hash = UInt256::zero();
//! assert!(hash.is_zero());
//!
//! let script_hash = UInt160::parse("0x0000000000000000000000000000000000000001").unwrap();
//! assert_eq!(script_hash.as_bytes()[0], 1);
//! ```

pub mod error;
pub mod uint160;
pub mod uint256;

pub use error::{PrimitiveError, PrimitiveResult};
pub use uint160::{UInt160, UINT160_SIZE};
pub use uint256::{UInt256, UINT256_SIZE};
