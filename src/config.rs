use std::path::PathBuf;

use crate::blockchain::{Blockchain, BlockchainError, DEFAULT_DIFFICULTY};

/// Default location of the ledger snapshot
pub const DEFAULT_SNAPSHOT_PATH: &str = "data/blockchain_contract.bin";

/// Runtime settings for opening a ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Snapshot file the ledger is loaded from and saved to
    pub snapshot_path: PathBuf,

    /// Difficulty every block must meet; a snapshot mined at another value is rejected
    pub difficulty: u8,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            difficulty: DEFAULT_DIFFICULTY,
        }
    }
}

impl LedgerConfig {
    /// Loads the configured ledger, creating a genesis-only one if no snapshot exists
    pub fn open(&self) -> Result<Blockchain, BlockchainError> {
        Blockchain::load_or_new(&self.snapshot_path, self.difficulty)
    }
}
