//! Append-only proof-of-work ledger for certificate issuance.
//!
//! Each issued certificate becomes a transaction `roll_no#name#contact#digest`
//! sealed into its own block. Anyone holding the document can later recompute
//! its SHA-256 digest and look it up with [`Blockchain::scan_for_digest`].
//!
//! ```no_run
//! use cert_ledger::{Blockchain, Transaction};
//!
//! let mut ledger = Blockchain::load_or_new("data/ledger.bin", 4)?;
//! let record = Transaction::new("101", "Alice", "9876543210", "ab".repeat(32))?;
//! ledger.append_transaction(&record)?;
//! ledger.seal()?;
//! ledger.save("data/ledger.bin")?;
//! assert!(ledger.scan_for_digest(&record.digest).is_some());
//! # Ok::<(), cert_ledger::BlockchainError>(())
//! ```

pub mod blockchain;
pub mod certificate;
pub mod config;

pub use blockchain::{
    Block, Blockchain, BlockchainError, StorageError, Transaction, TransactionError,
};
pub use certificate::{CertificateError, CertificateRequest, IssueReceipt, Verification};
pub use config::LedgerConfig;
