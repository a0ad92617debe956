//! Append-only failure diagnostics.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use crate::{Error, Result};

/// Pipe-delimited `recipient | media | cause` records, one per failed
/// attempt. Purely diagnostic; never consulted for control flow.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Append one failure record.
    pub fn record(&self, recipient: &str, media_ref: &str, cause: &str) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::append(&self.path, e))?;
        writeln!(
            file,
            "{recipient} | {media_ref} | {}",
            flatten(cause)
        )
        .map_err(|e| Error::append(&self.path, e))?;
        file.flush().map_err(|e| Error::append(&self.path, e))
    }
}

/// Keep the record one line even when the cause carries newlines.
fn flatten(cause: &str) -> String {
    cause.split_whitespace().collect::<Vec<_>>().join(" ")
}
