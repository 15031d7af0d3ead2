use std::path::Path;

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::block::Block;
use super::crypto::{meets_difficulty, GENESIS_PREVIOUS_HASH};
use super::storage::{read_snapshot, write_snapshot, StorageError};
use super::transaction::{Transaction, TransactionError};

/// Default mining difficulty (number of leading zero hex digits)
pub const DEFAULT_DIFFICULTY: u8 = 4;

/// Largest difficulty a 64 character hex hash can express
pub const MAX_DIFFICULTY: u8 = 64;

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Transaction data must not be empty")]
    EmptyTransaction,

    #[error("No pending transactions to seal")]
    NoPendingTransactions,

    #[error("Invalid difficulty: {0} (expected 1 to {})", MAX_DIFFICULTY)]
    InvalidDifficulty(u8),

    #[error("Snapshot was mined at difficulty {found}, expected {expected}")]
    DifficultyMismatch { expected: u8, found: u8 },

    #[error("Integrity violation at block {index}: {reason}")]
    Integrity { index: u64, reason: String },
}

/// Represents the certificate ledger
///
/// Owns the sealed chain and the buffer of transactions waiting for the next
/// block. All mutation goes through `append_transaction` and `seal`; callers
/// sharing a ledger across threads must wrap it in their own lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blockchain {
    /// The chain of blocks
    chain: Vec<Block>,

    /// Pending transactions to be included in the next block
    pending_transactions: Vec<String>,

    /// Mining difficulty (number of leading zeros required in hash)
    difficulty: u8,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Creates a new blockchain with a genesis block
    ///
    /// # Returns
    ///
    /// A new Blockchain instance using the default difficulty
    pub fn new() -> Self {
        Blockchain {
            chain: vec![Block::genesis()],
            pending_transactions: Vec::new(),
            difficulty: DEFAULT_DIFFICULTY,
        }
    }

    /// Creates a new blockchain with a custom mining difficulty
    ///
    /// # Arguments
    ///
    /// * `difficulty` - Number of leading zero hex digits required in block hashes
    pub fn with_difficulty(difficulty: u8) -> Result<Self, BlockchainError> {
        if difficulty == 0 || difficulty > MAX_DIFFICULTY {
            return Err(BlockchainError::InvalidDifficulty(difficulty));
        }

        Ok(Blockchain {
            difficulty,
            ..Blockchain::new()
        })
    }

    /// Loads a blockchain from a snapshot file and validates it
    ///
    /// # Arguments
    ///
    /// * `path` - The snapshot file path
    /// * `difficulty` - The difficulty this deployment requires
    ///
    /// # Returns
    ///
    /// The restored blockchain. A missing file yields `StorageError::NotFound`;
    /// a snapshot mined at any other difficulty is rejected.
    pub fn load<P: AsRef<Path>>(path: P, difficulty: u8) -> Result<Self, BlockchainError> {
        if difficulty == 0 || difficulty > MAX_DIFFICULTY {
            return Err(BlockchainError::InvalidDifficulty(difficulty));
        }

        let blockchain = read_snapshot(path)?;

        if blockchain.difficulty != difficulty {
            return Err(BlockchainError::DifficultyMismatch {
                expected: difficulty,
                found: blockchain.difficulty,
            });
        }
        blockchain.validate_chain()?;

        Ok(blockchain)
    }

    /// Loads a blockchain from a snapshot file, or creates a fresh one if none exists
    ///
    /// # Arguments
    ///
    /// * `path` - The snapshot file path
    /// * `difficulty` - The required difficulty, also used for a newly created ledger
    pub fn load_or_new<P: AsRef<Path>>(path: P, difficulty: u8) -> Result<Self, BlockchainError> {
        match Blockchain::load(path, difficulty) {
            Ok(blockchain) => Ok(blockchain),
            Err(BlockchainError::StorageError(StorageError::NotFound(path))) => {
                info!("No existing ledger found at {}, creating genesis block", path);
                Blockchain::with_difficulty(difficulty)
            }
            Err(err) => Err(err),
        }
    }

    /// Saves the blockchain to a snapshot file, overwriting the previous one
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BlockchainError> {
        write_snapshot(path, self)?;
        Ok(())
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> &Block {
        // The chain always holds at least the genesis block
        &self.chain[self.chain.len() - 1]
    }

    /// Adds a new transaction to the pending transactions
    ///
    /// # Arguments
    ///
    /// * `data` - The encoded transaction (or a `Transaction`)
    ///
    /// # Returns
    ///
    /// Result with the index of the block that will include this transaction
    pub fn append_transaction(&mut self, data: impl Into<String>) -> Result<u64, BlockchainError> {
        let data = data.into();

        if data.is_empty() {
            return Err(BlockchainError::EmptyTransaction);
        }

        self.pending_transactions.push(data);

        Ok(self.last_block().index() + 1)
    }

    /// Mines a new block with the pending transactions
    ///
    /// Blocks the calling thread until a nonce satisfying the difficulty is found.
    ///
    /// # Returns
    ///
    /// Result with the hash of the newly sealed block
    pub fn seal(&mut self) -> Result<String, BlockchainError> {
        if self.pending_transactions.is_empty() {
            return Err(BlockchainError::NoPendingTransactions);
        }

        let last_block = self.last_block();
        let timestamp = Utc::now().max(last_block.timestamp());

        let mut block = Block::new(
            self.chain.len() as u64,
            timestamp,
            self.pending_transactions.clone(),
            last_block.hash().to_string(),
        );

        let hash = block.mine(self.difficulty);

        info!(
            "Sealed block {} with {} transaction(s), nonce {}",
            block.index(),
            block.transactions().len(),
            block.nonce()
        );

        self.chain.push(block);
        self.pending_transactions.clear();

        Ok(hash)
    }

    /// Validates every block of the chain
    ///
    /// # Returns
    ///
    /// `BlockchainError::Integrity` describing the first corrupted block
    pub fn validate_chain(&self) -> Result<(), BlockchainError> {
        let genesis = match self.chain.first() {
            Some(genesis) => genesis,
            None => return Err(integrity(0, "chain has no genesis block")),
        };

        if genesis.index() != 0 {
            return Err(integrity(0, format!("genesis index is {}", genesis.index())));
        }
        if genesis.previous_hash() != GENESIS_PREVIOUS_HASH {
            return Err(integrity(0, "genesis previous hash is not the sentinel"));
        }
        if !genesis.has_valid_hash() {
            return Err(integrity(0, "stored hash does not match block contents"));
        }

        for (i, pair) in self.chain.windows(2).enumerate() {
            let (previous_block, current_block) = (&pair[0], &pair[1]);
            let position = (i + 1) as u64;

            if current_block.index() != position {
                return Err(integrity(
                    position,
                    format!("index is {}", current_block.index()),
                ));
            }

            // Check if the hash is correct
            if !current_block.has_valid_hash() {
                return Err(integrity(position, "stored hash does not match block contents"));
            }

            if !meets_difficulty(current_block.hash(), self.difficulty) {
                return Err(integrity(
                    position,
                    format!("hash does not meet difficulty {}", self.difficulty),
                ));
            }

            // Check if the previous hash is correct
            if current_block.previous_hash() != previous_block.hash() {
                return Err(integrity(position, "previous hash does not match prior block"));
            }

            if current_block.timestamp() < previous_block.timestamp() {
                return Err(integrity(position, "timestamp precedes prior block"));
            }
        }

        Ok(())
    }

    /// Validates the blockchain
    ///
    /// # Returns
    ///
    /// true if the blockchain is valid, false otherwise
    pub fn is_valid(&self) -> bool {
        self.validate_chain().is_ok()
    }

    /// Searches the sealed blocks for a transaction carrying the given digest
    ///
    /// Stored records are split into their four fields as-is and the fourth is
    /// compared; the first match wins. Entries without four fields are skipped.
    pub fn scan_for_digest(&self, digest: &str) -> Option<Transaction> {
        for block in self.chain.iter().skip(1) {
            for data in block.transactions() {
                match Transaction::from_parts(data) {
                    Ok(transaction) if transaction.digest == digest => return Some(transaction),
                    Ok(_) => {}
                    Err(err) => {
                        warn!(
                            "Skipping undecodable transaction in block {}: {}",
                            block.index(),
                            err
                        );
                    }
                }
            }
        }

        None
    }

    /// Gets the entire blockchain
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Gets all pending transactions
    pub fn pending_transactions(&self) -> &[String] {
        &self.pending_transactions
    }

    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    /// Number of blocks, including genesis
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: a ledger holds at least the genesis block
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

fn integrity(index: u64, reason: impl Into<String>) -> BlockchainError {
    BlockchainError::Integrity {
        index,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::sha256_hex;

    fn test_blockchain() -> Blockchain {
        Blockchain::with_difficulty(2).unwrap()
    }

    fn record(roll_no: &str, name: &str, document: &[u8]) -> Transaction {
        Transaction::new(roll_no, name, "9876543210", sha256_hex(document)).unwrap()
    }

    fn assert_integrity_error_from(blockchain: &Blockchain, corrupted: u64) {
        match blockchain.validate_chain() {
            Err(BlockchainError::Integrity { index, .. }) => assert!(index >= corrupted),
            other => panic!("expected integrity error, got {:?}", other),
        }
    }

    #[test]
    fn test_new_blockchain() {
        let blockchain = Blockchain::new();
        let chain = blockchain.chain();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].index(), 0);
        assert_eq!(chain[0].previous_hash(), GENESIS_PREVIOUS_HASH);
        assert_eq!(blockchain.difficulty(), DEFAULT_DIFFICULTY);
        assert!(blockchain.is_valid());
    }

    #[test]
    fn test_invalid_difficulty() {
        assert!(matches!(
            Blockchain::with_difficulty(0),
            Err(BlockchainError::InvalidDifficulty(0))
        ));
        assert!(matches!(
            Blockchain::with_difficulty(65),
            Err(BlockchainError::InvalidDifficulty(65))
        ));
    }

    #[test]
    fn test_append_transaction() {
        let mut blockchain = test_blockchain();

        let block_index = blockchain.append_transaction("101#Alice#9876543210#abcd").unwrap();
        assert_eq!(block_index, 1);

        // Duplicates are kept
        blockchain.append_transaction("101#Alice#9876543210#abcd").unwrap();
        assert_eq!(blockchain.pending_transactions().len(), 2);
        assert_eq!(blockchain.len(), 1);
    }

    #[test]
    fn test_append_empty_transaction() {
        let mut blockchain = test_blockchain();

        assert!(matches!(
            blockchain.append_transaction(""),
            Err(BlockchainError::EmptyTransaction)
        ));
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_seal_without_pending() {
        let mut blockchain = test_blockchain();

        assert!(matches!(
            blockchain.seal(),
            Err(BlockchainError::NoPendingTransactions)
        ));
        assert_eq!(blockchain.len(), 1);
    }

    #[test]
    fn test_seal_block() {
        let mut blockchain = test_blockchain();
        let transaction = record("101", "Alice", b"certificate A");
        let genesis_hash = blockchain.last_block().hash().to_string();

        blockchain.append_transaction(&transaction).unwrap();
        let hash = blockchain.seal().unwrap();

        let chain = blockchain.chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].index(), 1);
        assert_eq!(chain[1].hash(), hash);
        assert_eq!(chain[1].transactions(), [transaction.encode()]);
        assert_eq!(chain[1].previous_hash(), genesis_hash);
        assert!(hash.starts_with("00"));

        // Check that the pending transactions are cleared
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_seal_batches_pending() {
        let mut blockchain = test_blockchain();

        blockchain.append_transaction(&record("101", "Alice", b"A")).unwrap();
        blockchain.append_transaction(&record("102", "Bob", b"B")).unwrap();
        blockchain.seal().unwrap();

        assert_eq!(blockchain.len(), 2);
        assert_eq!(blockchain.last_block().transactions().len(), 2);
    }

    #[test]
    fn test_sequential_seals() {
        let mut blockchain = test_blockchain();

        for (i, name) in ["Alice", "Bob", "Carol"].iter().enumerate() {
            blockchain
                .append_transaction(&record(&format!("10{}", i), name, name.as_bytes()))
                .unwrap();
            blockchain.seal().unwrap();
        }

        let chain = blockchain.chain();
        assert_eq!(chain.len(), 4);
        for (i, block) in chain.iter().enumerate() {
            assert_eq!(block.index(), i as u64);
            assert!(block.has_valid_hash());
        }
        for pair in chain.windows(2) {
            assert_eq!(pair[1].previous_hash(), pair[0].hash());
            assert!(pair[1].timestamp() >= pair[0].timestamp());
            assert!(meets_difficulty(pair[1].hash(), 2));
        }
        assert_ne!(chain[2].previous_hash(), chain[0].hash());
        assert!(blockchain.is_valid());
    }

    #[test]
    fn test_validate_is_repeatable() {
        let mut blockchain = test_blockchain();
        blockchain.append_transaction(&record("101", "Alice", b"A")).unwrap();
        blockchain.seal().unwrap();

        for _ in 0..3 {
            assert!(blockchain.validate_chain().is_ok());
        }
    }

    #[test]
    fn test_detects_tampered_transaction() {
        let mut blockchain = test_blockchain();
        for name in ["Alice", "Bob"] {
            blockchain.append_transaction(&record("101", name, name.as_bytes())).unwrap();
            blockchain.seal().unwrap();
        }

        blockchain.chain[1].transactions[0] = record("101", "Mallory", b"forged").encode();

        assert_integrity_error_from(&blockchain, 1);
    }

    #[test]
    fn test_detects_rehashed_block() {
        let mut blockchain = test_blockchain();
        for name in ["Alice", "Bob"] {
            blockchain.append_transaction(&record("101", name, name.as_bytes())).unwrap();
            blockchain.seal().unwrap();
        }

        // A forger re-mines block 1, which breaks the link from block 2
        blockchain.chain[1].transactions[0] = record("101", "Mallory", b"forged").encode();
        blockchain.chain[1].mine(2);

        match blockchain.validate_chain() {
            Err(BlockchainError::Integrity { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected integrity error, got {:?}", other),
        }
    }

    #[test]
    fn test_detects_every_field() {
        let mut sealed = test_blockchain();
        sealed.append_transaction(&record("101", "Alice", b"A")).unwrap();
        sealed.seal().unwrap();

        let mut blockchain = sealed.clone();
        blockchain.chain[1].nonce += 1;
        assert_integrity_error_from(&blockchain, 1);

        let mut blockchain = sealed.clone();
        blockchain.chain[1].index = 5;
        assert_integrity_error_from(&blockchain, 1);

        let mut blockchain = sealed.clone();
        let shifted = blockchain.chain[1].timestamp + chrono::Duration::seconds(1);
        blockchain.chain[1].timestamp = shifted;
        assert_integrity_error_from(&blockchain, 1);

        let mut blockchain = sealed.clone();
        blockchain.chain[1].previous_hash = "ff".repeat(32);
        assert_integrity_error_from(&blockchain, 1);

        let mut blockchain = sealed.clone();
        blockchain.chain[1].hash = "00".repeat(32);
        assert_integrity_error_from(&blockchain, 1);

        let mut blockchain = sealed;
        blockchain.chain[0].transactions.push("genesis#tampered#0000000000#00".to_string());
        assert_integrity_error_from(&blockchain, 0);
    }

    #[test]
    fn test_detects_difficulty_bypass() {
        let mut blockchain = test_blockchain();
        blockchain.append_transaction(&record("101", "Alice", b"A")).unwrap();

        // Build a block whose hash is consistent but was never mined
        let previous_hash = blockchain.last_block().hash().to_string();
        let pending = blockchain.pending_transactions.clone();
        let mut block = Block::new(1, Utc::now(), pending, previous_hash);
        while meets_difficulty(&block.calculate_hash(), 2) {
            block.nonce += 1;
        }
        block.hash = block.calculate_hash();
        blockchain.chain.push(block);

        assert_integrity_error_from(&blockchain, 1);
    }

    #[test]
    fn test_scan_for_digest() {
        let mut blockchain = test_blockchain();
        let digest_a = sha256_hex(b"certificate A");
        let digest_b = sha256_hex(b"certificate B");

        blockchain
            .append_transaction(format!("101#Alice#9876543210#{}", digest_a))
            .unwrap();
        blockchain.seal().unwrap();

        let found = blockchain.scan_for_digest(&digest_a).unwrap();
        assert_eq!(
            (found.roll_no.as_str(), found.name.as_str(), found.contact.as_str()),
            ("101", "Alice", "9876543210")
        );
        assert_eq!(found.digest, digest_a);

        assert_eq!(blockchain.scan_for_digest(&digest_b), None);
    }

    #[test]
    fn test_scan_first_match_wins() {
        let mut blockchain = test_blockchain();
        let digest = sha256_hex(b"shared");

        for name in ["Alice", "Bob"] {
            let transaction = Transaction::new("101", name, "9876543210", digest.as_str()).unwrap();
            blockchain.append_transaction(transaction).unwrap();
            blockchain.seal().unwrap();
        }

        assert_eq!(blockchain.scan_for_digest(&digest).unwrap().name, "Alice");
    }

    #[test]
    fn test_scan_skips_malformed_and_pending() {
        let mut blockchain = test_blockchain();
        let digest = sha256_hex(b"certificate");

        blockchain.append_transaction("garbage without separators").unwrap();
        blockchain.seal().unwrap();
        blockchain.append_transaction(&record("101", "Alice", b"certificate")).unwrap();

        // Pending entries are not part of the ledger yet
        assert_eq!(blockchain.scan_for_digest(&digest), None);

        blockchain.seal().unwrap();
        assert_eq!(blockchain.scan_for_digest(&digest).unwrap().name, "Alice");
    }

    #[test]
    fn test_scan_finds_record_with_empty_field() {
        let mut blockchain = test_blockchain();
        let digest = sha256_hex(b"certificate");

        blockchain
            .append_transaction(format!("101##9876543210#{}", digest))
            .unwrap();
        blockchain.seal().unwrap();

        let found = blockchain.scan_for_digest(&digest).unwrap();
        assert_eq!(found.roll_no, "101");
        assert_eq!(found.name, "");
        assert_eq!(found.contact, "9876543210");
        assert_eq!(found.digest, digest);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.bin");

        let mut blockchain = test_blockchain();
        blockchain.append_transaction(&record("101", "Alice", b"A")).unwrap();
        blockchain.seal().unwrap();
        blockchain.save(&path).unwrap();

        let loaded = Blockchain::load(&path, 2).unwrap();
        assert_eq!(loaded, blockchain);
        assert_eq!(loaded.difficulty(), 2);
    }

    #[test]
    fn test_load_rejects_tampered_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.bin");

        let mut blockchain = test_blockchain();
        blockchain.append_transaction(&record("101", "Alice", b"A")).unwrap();
        blockchain.seal().unwrap();
        blockchain.chain[1].transactions[0] = record("101", "Mallory", b"A").encode();
        blockchain.save(&path).unwrap();

        assert!(matches!(
            Blockchain::load(&path, 2),
            Err(BlockchainError::Integrity { index: 1, .. })
        ));
    }

    #[test]
    fn test_load_rejects_other_difficulty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.bin");

        let mut blockchain = Blockchain::with_difficulty(1).unwrap();
        blockchain.append_transaction(&record("101", "Alice", b"A")).unwrap();
        blockchain.seal().unwrap();
        blockchain.save(&path).unwrap();

        assert!(matches!(
            Blockchain::load(&path, 4),
            Err(BlockchainError::DifficultyMismatch { expected: 4, found: 1 })
        ));
        assert!(matches!(
            Blockchain::load_or_new(&path, 4),
            Err(BlockchainError::DifficultyMismatch { expected: 4, found: 1 })
        ));
        assert!(matches!(
            Blockchain::load(&path, 0),
            Err(BlockchainError::InvalidDifficulty(0))
        ));
        assert_eq!(Blockchain::load(&path, 1).unwrap(), blockchain);
    }

    #[test]
    fn test_load_or_new() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.bin");

        let blockchain = Blockchain::load_or_new(&path, 3).unwrap();
        assert_eq!(blockchain.len(), 1);
        assert_eq!(blockchain.difficulty(), 3);

        std::fs::write(&path, b"corrupt").unwrap();
        assert!(matches!(
            Blockchain::load_or_new(&path, 3),
            Err(BlockchainError::StorageError(_))
        ));
    }
}
