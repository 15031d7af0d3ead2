//! Certificate issuance and verification on top of the ledger.
//!
//! This is the layer a front end talks to: it validates the holder details,
//! fingerprints the certificate document, and either records it in a new
//! block or looks its fingerprint up in the chain.

use std::fs;
use std::path::Path;

use log::info;
use thiserror::Error;

use crate::blockchain::crypto::sha256_hex;
use crate::blockchain::transaction::FIELD_SEPARATOR;
use crate::blockchain::{Blockchain, BlockchainError, Transaction};

/// Required length of a contact number
pub const CONTACT_LEN: usize = 10;

/// Errors that can occur while issuing or verifying a certificate
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to read document {path}: {source}")]
    Document {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Blockchain error: {0}")]
    BlockchainError(#[from] BlockchainError),
}

/// Holder details entered when a certificate is issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub roll_no: String,
    pub name: String,
    pub contact: String,
}

impl CertificateRequest {
    pub fn new(
        roll_no: impl Into<String>,
        name: impl Into<String>,
        contact: impl Into<String>,
    ) -> Self {
        CertificateRequest {
            roll_no: roll_no.into(),
            name: name.into(),
            contact: contact.into(),
        }
    }

    /// Checks the holder details before anything reaches the ledger
    ///
    /// Every field must be non-blank and free of the record separator, and the
    /// contact number must be exactly ten digits.
    pub fn validate(&self) -> Result<(), CertificateError> {
        for (field, value) in [
            ("roll number", &self.roll_no),
            ("name", &self.name),
            ("contact number", &self.contact),
        ] {
            if value.trim().is_empty() {
                return Err(CertificateError::InvalidInput(format!("{} is required", field)));
            }
            if value.contains(FIELD_SEPARATOR) {
                return Err(CertificateError::InvalidInput(format!(
                    "{} must not contain '{}'",
                    field, FIELD_SEPARATOR
                )));
            }
        }

        if self.contact.len() != CONTACT_LEN || !self.contact.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CertificateError::InvalidInput(format!(
                "contact number must be exactly {} digits",
                CONTACT_LEN
            )));
        }

        Ok(())
    }
}

/// Details of a freshly sealed certificate block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReceipt {
    pub block_index: u64,
    pub previous_hash: String,
    pub block_hash: String,
    pub digest: String,
}

/// Outcome of a verification lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The document is recorded; carries the record found in the ledger
    Verified(Transaction),

    /// No block holds the document's digest
    NotFound,
}

/// Computes the SHA-256 digest of a document's raw bytes
pub fn digest_document<P: AsRef<Path>>(path: P) -> Result<String, CertificateError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| CertificateError::Document {
        path: path.display().to_string(),
        source,
    })?;

    Ok(sha256_hex(&bytes))
}

/// Records a certificate in a new block and persists the ledger
///
/// # Arguments
///
/// * `blockchain` - The ledger to append to
/// * `request` - The holder details
/// * `document` - Path to the certificate document
/// * `snapshot_path` - Where the ledger snapshot is written after sealing
///
/// # Returns
///
/// The receipt describing the sealed block
pub fn issue<P: AsRef<Path>, Q: AsRef<Path>>(
    blockchain: &mut Blockchain,
    request: &CertificateRequest,
    document: P,
    snapshot_path: Q,
) -> Result<IssueReceipt, CertificateError> {
    request.validate()?;
    let digest = digest_document(document)?;

    let transaction = Transaction::new(
        request.roll_no.as_str(),
        request.name.as_str(),
        request.contact.as_str(),
        digest.as_str(),
    )
    .map_err(BlockchainError::from)?;

    blockchain.append_transaction(&transaction)?;
    let block_hash = blockchain.seal()?;
    blockchain.save(snapshot_path)?;

    let block = blockchain.last_block();
    info!("Issued certificate for roll number {} in block {}", request.roll_no, block.index());

    Ok(IssueReceipt {
        block_index: block.index(),
        previous_hash: block.previous_hash().to_string(),
        block_hash,
        digest,
    })
}

/// Looks a document up in the ledger by its digest
pub fn verify<P: AsRef<Path>>(
    blockchain: &Blockchain,
    document: P,
) -> Result<Verification, CertificateError> {
    let digest = digest_document(document)?;

    Ok(match blockchain.scan_for_digest(&digest) {
        Some(transaction) => Verification::Verified(transaction),
        None => Verification::NotFound,
    })
}
