//! Durable delivery bookkeeping.
//!
//! Two append-only, line-oriented files: the sent ledger (consulted for
//! deduplication across runs) and the error log (diagnostic only, never
//! read back). Both are written from the single dispatch task.

pub mod errors;
pub mod sent;

pub use {
    errors::ErrorLog,
    sent::SentLedger,
};

use std::path::PathBuf;

/// Crate-wide result type for ledger operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load ledger {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append to {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    #[must_use]
    pub fn load(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Load {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn append(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Append {
            path: path.into(),
            source,
        }
    }
}
