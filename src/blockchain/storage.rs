use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use bincode::Options;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::chain::Blockchain;

/// Format tag written at the start of every snapshot
pub const SNAPSHOT_FORMAT: &str = "cert-ledger/1";

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Unsupported snapshot format: {0}")]
    UnsupportedFormat(String),

    #[error("Snapshot not found: {0}")]
    NotFound(String),
}

/// Fixed-width little-endian encoding; a snapshot must be consumed exactly
fn snapshot_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    format: &'a str,
    blockchain: &'a Blockchain,
}

#[derive(Deserialize)]
struct Snapshot {
    format: String,
    blockchain: Blockchain,
}

/// Writes the full ledger to a snapshot file, replacing any previous content
///
/// # Arguments
///
/// * `path` - The snapshot file path
/// * `blockchain` - The ledger to persist
pub fn write_snapshot<P: AsRef<Path>>(
    path: P,
    blockchain: &Blockchain,
) -> Result<(), StorageError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let snapshot = SnapshotRef {
        format: SNAPSHOT_FORMAT,
        blockchain,
    };
    let value = snapshot_options()
        .serialize(&snapshot)
        .map_err(|e| StorageError::SerializationError(e.to_string()))?;

    fs::write(path, value)?;

    info!(
        "Saved snapshot with {} blocks to {}",
        blockchain.len(),
        path.display()
    );
    Ok(())
}

/// Reads a ledger from a snapshot file
///
/// A missing file is reported as `StorageError::NotFound` so callers can fall
/// back to a fresh ledger; unreadable or corrupt content is always an error.
pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<Blockchain, StorageError> {
    let path = path.as_ref();

    let value = match fs::read(path) {
        Ok(value) => value,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StorageError::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(StorageError::Io(e)),
    };

    let snapshot: Snapshot = snapshot_options()
        .deserialize(&value)
        .map_err(|e| StorageError::DeserializationError(e.to_string()))?;

    if snapshot.format != SNAPSHOT_FORMAT {
        return Err(StorageError::UnsupportedFormat(snapshot.format));
    }

    info!(
        "Loaded snapshot with {} blocks from {}",
        snapshot.blockchain.len(),
        path.display()
    );
    Ok(snapshot.blockchain)
}
