//! # Neo IO
//!
//! The binary wire codec used by every serializable entity in the node.
//!
//! - [`MemoryReader`]: a cursor over a borrowed buffer. It is `Clone`, so a
//!   caller can peek ahead on a copy without consuming bytes from the original.
//! - [`BinaryWriter`]: an append-only little-endian writer.
//! - [`Serializable`]: the size/serialize/deserialize contract.
//!
//! All multi-byte integers are little-endian. Lengths use the Neo variable
//! length integer (`0xfd` + u16, `0xfe` + u32, `0xff` + u64).

pub mod binary_writer;
pub mod error;
pub mod memory_reader;
pub mod serializable;

pub use binary_writer::BinaryWriter;
pub use error::{IoError, IoResult};
pub use memory_reader::MemoryReader;
pub use serializable::{helper, Serializable, SerializableExt};
