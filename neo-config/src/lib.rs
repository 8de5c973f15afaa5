//! Neo node configuration.
//!
//! A [`NodeConfig`] is read from TOML. Every section and field has a default,
//! so an empty file is a valid (non-validating) node.
//!
//! ```toml
//! [consensus]
//! enabled = true
//! private_key = "…"
//! validators = ["02…", "03…"]
//! seconds_per_block = 15
//!
//! [storage]
//! backend = "rocksdb"
//! path = "./data"
//! cache_size_bytes = 67108864
//!
//! [logging]
//! level = "info"
//! ```

mod error;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Blockchain timing constants
pub const SECONDS_PER_BLOCK: u64 = 15;

pub use neo_core::{MAX_TRANSACTIONS_PER_BLOCK, MAX_VALIDATORS};

/// Default cache budget: 64 MiB.
pub const DEFAULT_CACHE_SIZE_BYTES: usize = 64 * 1024 * 1024;

/// Top-level node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub consensus: ConsensusSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

impl NodeConfig {
    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(ConfigError::from)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        let consensus = &self.consensus;
        if consensus.enabled && consensus.validators.is_empty() {
            return Err(ConfigError::invalid("consensus.validators", "must not be empty"));
        }
        if consensus.validators.len() > MAX_VALIDATORS {
            return Err(ConfigError::invalid(
                "consensus.validators",
                format!("at most {MAX_VALIDATORS} validators are supported"),
            ));
        }
        if consensus.seconds_per_block == 0 {
            return Err(ConfigError::invalid("consensus.seconds_per_block", "must be positive"));
        }
        if consensus.max_transactions_per_block == 0 {
            return Err(ConfigError::invalid(
                "consensus.max_transactions_per_block",
                "must leave room for the miner transaction",
            ));
        }
        if consensus.max_transactions_per_block > MAX_TRANSACTIONS_PER_BLOCK {
            return Err(ConfigError::invalid(
                "consensus.max_transactions_per_block",
                format!("at most {MAX_TRANSACTIONS_PER_BLOCK} transactions fit in a block"),
            ));
        }
        if self.storage.cache_size_bytes == 0 {
            return Err(ConfigError::invalid("storage.cache_size_bytes", "must be positive"));
        }
        if self.storage.backend == StorageBackend::RocksDb && self.storage.path.is_none() {
            return Err(ConfigError::invalid("storage.path", "required for the rocksdb backend"));
        }
        Ok(())
    }
}

/// dBFT settings. Quorum sizes are derived from the validator count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusSettings {
    pub enabled: bool,
    /// Hex-encoded 32-byte secp256r1 private key of this validator.
    pub private_key: Option<String>,
    /// Hex-encoded compressed public keys, in validator index order.
    pub validators: Vec<String>,
    pub seconds_per_block: u64,
    pub max_transactions_per_block: usize,
    /// Views ahead of the current one whose messages are buffered.
    pub max_future_views: u8,
    /// Buffered messages kept per future view.
    pub max_buffered_per_view: usize,
    /// View number at which a stalled round raises an operational alert.
    pub view_change_alert_threshold: u8,
    /// Run without peers; only meaningful with a single validator.
    pub private_net: bool,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            private_key: None,
            validators: Vec::new(),
            seconds_per_block: SECONDS_PER_BLOCK,
            max_transactions_per_block: MAX_TRANSACTIONS_PER_BLOCK,
            max_future_views: 8,
            max_buffered_per_view: 64,
            view_change_alert_threshold: 6,
            private_net: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    RocksDb,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::RocksDb => write!(f, "rocksdb"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageBackend::Memory),
            "rocksdb" | "rocks" => Ok(StorageBackend::RocksDb),
            _ => Err(ConfigError::invalid("storage.backend", format!("unknown backend {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub path: Option<PathBuf>,
    pub cache_size_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: None,
            cache_size_bytes: DEFAULT_CACHE_SIZE_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive, e.g. `info` or `neo_consensus=debug`.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
