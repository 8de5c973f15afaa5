//! Consensus message type identifiers.

use serde::{Deserialize, Serialize};

/// Leading byte of every encoded consensus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ConsensusMessageType {
    /// Request to move the round to a higher view
    ChangeView = 0x00,
    /// Block proposal sent by the primary
    PrepareRequest = 0x20,
    /// A backup's signature over the proposed header
    PrepareResponse = 0x21,
}

impl ConsensusMessageType {
    /// Converts from byte value
    #[must_use]
    pub const fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::ChangeView),
            0x20 => Some(Self::PrepareRequest),
            0x21 => Some(Self::PrepareResponse),
            _ => None,
        }
    }

    /// Converts to byte value
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChangeView => "ChangeView",
            Self::PrepareRequest => "PrepareRequest",
            Self::PrepareResponse => "PrepareResponse",
        }
    }
}

impl std::fmt::Display for ConsensusMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
