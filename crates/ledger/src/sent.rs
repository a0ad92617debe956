//! Recipients already delivered, one per line.

use std::{
    collections::HashSet,
    io::Write,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{Error, Result};

/// In-memory view of the sent file, loaded once at startup.
///
/// A recipient present here is never attempted again in a later run.
#[derive(Debug)]
pub struct SentLedger {
    path: PathBuf,
    sent: HashSet<String>,
}

impl SentLedger {
    /// Load the ledger; a missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self> {
        let sent = match std::fs::read_to_string(path) {
            Ok(raw) => raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(Error::load(path, e)),
        };
        debug!(path = %path.display(), entries = sent.len(), "sent ledger loaded");
        Ok(Self {
            path: path.to_path_buf(),
            sent,
        })
    }

    /// O(1) membership check against the in-memory set.
    #[must_use]
    pub fn contains(&self, recipient: &str) -> bool {
        self.sent.contains(recipient)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sent.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }

    /// Record a terminal success, durably and in memory.
    ///
    /// Call only after every part of the delivery succeeded.
    pub fn mark_sent(&mut self, recipient: &str) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::append(&self.path, e))?;
        writeln!(file, "{recipient}").map_err(|e| Error::append(&self.path, e))?;
        file.flush().map_err(|e| Error::append(&self.path, e))?;
        self.sent.insert(recipient.to_string());
        Ok(())
    }
}
