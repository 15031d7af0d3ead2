// Blockchain module
//
// This module contains the core ledger implementation including:
// - Block structure
// - Blockchain structure
// - Transaction record
// - Digest utilities
// - Snapshot persistence

pub mod block;
pub mod chain;
pub mod crypto;
pub mod storage;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Blockchain, BlockchainError, DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
pub use storage::StorageError;
pub use transaction::{Transaction, TransactionError};
