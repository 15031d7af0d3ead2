use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::crypto::{meets_difficulty, GENESIS_PREVIOUS_HASH};

/// Represents a block in the ledger
///
/// Fields are read-only outside the crate. Once a block has been sealed and
/// appended it is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Index of the block in the chain
    pub(crate) index: u64,

    /// Timestamp when the block was created
    pub(crate) timestamp: DateTime<Utc>,

    /// Encoded transactions included in this block
    pub(crate) transactions: Vec<String>,

    /// Hash of the previous block
    pub(crate) previous_hash: String,

    /// Proof of work (nonce)
    pub(crate) nonce: u64,

    /// Hash of the current block (empty until sealed)
    pub(crate) hash: String,
}

/// Canonical view of the fields covered by the block hash
#[derive(Serialize)]
struct HashInput<'a> {
    index: u64,
    timestamp: &'a DateTime<Utc>,
    transactions: &'a [String],
    previous_hash: &'a str,
    nonce: u64,
}

impl Block {
    /// Creates a new unsealed block
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `timestamp` - The creation time of the block
    /// * `transactions` - The encoded transactions to include in the block
    /// * `previous_hash` - The hash of the previous block
    ///
    /// # Returns
    ///
    /// A new Block with nonce 0 and no hash
    pub fn new(
        index: u64,
        timestamp: DateTime<Utc>,
        transactions: Vec<String>,
        previous_hash: String,
    ) -> Self {
        Block {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash: String::new(),
        }
    }

    /// Creates the genesis block
    ///
    /// The genesis block carries no transactions and is exempt from proof of work.
    pub fn genesis() -> Self {
        let mut block = Block::new(0, Utc::now(), Vec::new(), GENESIS_PREVIOUS_HASH.to_string());
        block.hash = block.calculate_hash();
        block
    }

    /// Calculates the hash of the block
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block as a hexadecimal string
    pub fn calculate_hash(&self) -> String {
        let input = HashInput {
            index: self.index,
            timestamp: &self.timestamp,
            transactions: &self.transactions,
            previous_hash: &self.previous_hash,
            nonce: self.nonce,
        };

        // Serializing plain strings and integers cannot fail
        let block_string = serde_json::to_vec(&input).expect("block fields serialize to JSON");

        hex::encode(Sha256::digest(&block_string))
    }

    /// Searches for a nonce whose hash satisfies the difficulty, then freezes the hash
    ///
    /// # Returns
    ///
    /// The winning hash
    pub(crate) fn mine(&mut self, difficulty: u8) -> String {
        self.nonce = 0;

        loop {
            let hash = self.calculate_hash();

            if meets_difficulty(&hash, difficulty) {
                debug!("Block {} mined after {} attempts", self.index, self.nonce + 1);
                self.hash = hash.clone();
                return hash;
            }

            self.nonce += 1;
        }
    }

    /// Returns true if the stored hash matches the block's own fields
    pub fn has_valid_hash(&self) -> bool {
        !self.hash.is_empty() && self.hash == self.calculate_hash()
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn transactions(&self) -> &[String] {
        &self.transactions
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block::new(
            1,
            Utc::now(),
            vec!["101#Alice#9876543210#abcd".to_string()],
            "previous_hash".to_string(),
        )
    }

    #[test]
    fn test_new_block() {
        let block = sample_block();

        assert_eq!(block.index(), 1);
        assert_eq!(block.nonce(), 0);
        assert_eq!(block.previous_hash(), "previous_hash");
        assert!(block.hash().is_empty());
        assert!(!block.has_valid_hash());
    }

    #[test]
    fn test_calculate_hash() {
        let block = sample_block();

        let hash = block.calculate_hash();
        assert_eq!(hash.len(), 64); // SHA-256 hash is 64 characters in hex
        assert_eq!(hash, block.clone().calculate_hash());
    }

    #[test]
    fn test_hash_covers_every_field() {
        let block = sample_block();
        let original = block.calculate_hash();

        let mut other = block.clone();
        other.nonce = 7;
        assert_ne!(other.calculate_hash(), original);

        let mut other = block.clone();
        other.transactions.push("102#Bob#9876543211#ef01".to_string());
        assert_ne!(other.calculate_hash(), original);

        let mut other = block.clone();
        other.previous_hash = "other".to_string();
        assert_ne!(other.calculate_hash(), original);

        let mut other = block;
        other.index = 2;
        assert_ne!(other.calculate_hash(), original);
    }

    #[test]
    fn test_mine() {
        let mut block = sample_block();
        let hash = block.mine(2);

        assert!(hash.starts_with("00"));
        assert_eq!(block.hash(), hash);
        assert!(block.has_valid_hash());
    }

    #[test]
    fn test_genesis() {
        let genesis = Block::genesis();

        assert_eq!(genesis.index(), 0);
        assert_eq!(genesis.nonce(), 0);
        assert!(genesis.transactions().is_empty());
        assert_eq!(genesis.previous_hash(), GENESIS_PREVIOUS_HASH);
        assert!(genesis.has_valid_hash());
    }
}
