use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

use super::crypto::{is_hex_digest, DIGEST_HEX_LEN};

/// Character joining the fields of an encoded transaction
pub const FIELD_SEPARATOR: char = '#';

/// Errors that can occur while building or decoding a transaction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} contains the reserved separator '{separator}'")]
    ReservedSeparator { field: &'static str, separator: char },

    #[error("Malformed transaction: expected 4 fields, found {0}")]
    Malformed(usize),

    #[error("Digest must be {} hex characters: {0}", DIGEST_HEX_LEN)]
    InvalidDigest(String),
}

/// A certificate issuance record
///
/// Stored in blocks in its encoded form `roll_no#name#contact#digest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Roll number of the certificate holder
    pub roll_no: String,

    /// Name of the certificate holder
    pub name: String,

    /// Contact number of the holder
    pub contact: String,

    /// SHA-256 digest of the certificate document, hex-encoded
    pub digest: String,
}

impl Transaction {
    /// Creates a new transaction
    ///
    /// # Arguments
    ///
    /// * `roll_no` - The holder's roll number
    /// * `name` - The holder's name
    /// * `contact` - The holder's contact number
    /// * `digest` - The document digest
    ///
    /// # Returns
    ///
    /// A new Transaction, or an error if a field is empty or contains the
    /// separator, or the digest is not a hex-encoded SHA-256 hash
    pub fn new(
        roll_no: impl Into<String>,
        name: impl Into<String>,
        contact: impl Into<String>,
        digest: impl Into<String>,
    ) -> Result<Self, TransactionError> {
        let transaction = Transaction {
            roll_no: roll_no.into(),
            name: name.into(),
            contact: contact.into(),
            digest: digest.into(),
        };

        for (field, value) in transaction.fields() {
            if value.is_empty() {
                return Err(TransactionError::MissingField(field));
            }
            if value.contains(FIELD_SEPARATOR) {
                return Err(TransactionError::ReservedSeparator {
                    field,
                    separator: FIELD_SEPARATOR,
                });
            }
        }

        if !is_hex_digest(&transaction.digest) {
            return Err(TransactionError::InvalidDigest(transaction.digest));
        }

        Ok(transaction)
    }

    /// Splits an encoded record into its four fields without validating them
    ///
    /// Used when reading back what the ledger already stores.
    pub(crate) fn from_parts(data: &str) -> Result<Self, TransactionError> {
        let parts: Vec<&str> = data.split(FIELD_SEPARATOR).collect();

        match parts.as_slice() {
            [roll_no, name, contact, digest] => Ok(Transaction {
                roll_no: roll_no.to_string(),
                name: name.to_string(),
                contact: contact.to_string(),
                digest: digest.to_string(),
            }),
            _ => Err(TransactionError::Malformed(parts.len())),
        }
    }

    /// Encodes the transaction into its delimited string form
    pub fn encode(&self) -> String {
        let sep = FIELD_SEPARATOR.to_string();
        [
            self.roll_no.as_str(),
            self.name.as_str(),
            self.contact.as_str(),
            self.digest.as_str(),
        ]
        .join(&sep)
    }

    /// Decodes a transaction from its delimited string form
    pub fn decode(data: &str) -> Result<Self, TransactionError> {
        let parts = Transaction::from_parts(data)?;
        Transaction::new(parts.roll_no, parts.name, parts.contact, parts.digest)
    }

    fn fields(&self) -> [(&'static str, &str); 4] {
        [
            ("roll_no", self.roll_no.as_str()),
            ("name", self.name.as_str()),
            ("contact", self.contact.as_str()),
            ("digest", self.digest.as_str()),
        ]
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for Transaction {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Transaction::decode(s)
    }
}

impl From<&Transaction> for String {
    fn from(transaction: &Transaction) -> Self {
        transaction.encode()
    }
}

impl From<Transaction> for String {
    fn from(transaction: Transaction) -> Self {
        transaction.encode()
    }
}
