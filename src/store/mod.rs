//! Durable state, persisted as small JSON documents.
//!
//! Each store rewrites its whole document on every mutation (write to a
//! sibling temp file, then rename). A document that cannot be read falls
//! back to the empty default; a failed write is logged and swallowed.

mod monthly;
mod winners;

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use monthly::MonthlyRollup;
pub use winners::{RemovalOutcome, WinnerLedger};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read a document, falling back to the default when the file is missing
/// or unreadable.
fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("could not parse {}: {e}; starting empty", path.display());
                T::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => T::default(),
        Err(e) => {
            tracing::warn!("could not read {}: {e}; starting empty", path.display());
            T::default()
        }
    }
}

/// Rewrite a document in full, atomically (temp file + rename).
fn persist<T: Serialize>(path: &Path, doc: &T) -> StoreResult<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Persist, logging instead of failing: a lost write is an accepted
/// durability gap.
fn persist_logged<T: Serialize>(path: &Path, doc: &T) {
    if let Err(e) = persist(path, doc) {
        tracing::error!("failed to persist {}: {e}", path.display());
    }
}
