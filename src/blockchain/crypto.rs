use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Previous hash recorded in the genesis block
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Computes the SHA-256 digest of raw bytes
///
/// # Arguments
///
/// * `bytes` - The data to hash
///
/// # Returns
///
/// The digest as a lowercase hexadecimal string
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Checks a hash against the proof-of-work predicate
///
/// A hash satisfies difficulty `n` when its first `n` hex characters are all `'0'`.
pub fn meets_difficulty(hash: &str, difficulty: u8) -> bool {
    let difficulty = difficulty as usize;
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Returns true if the string is a 64 character hex digest
pub fn is_hex_digest(value: &str) -> bool {
    value.len() == DIGEST_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}
