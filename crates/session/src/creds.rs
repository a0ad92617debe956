//! Durable store for the client-owned credential records.
//!
//! One JSON file per record under the auth directory. Writes complete
//! before the update handler returns; a logout wipes the directory
//! wholesale.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    types::CredentialRecord,
};

/// Name of the primary record; its presence decides fresh vs resumable.
const PRIMARY_RECORD: &str = "creds";

#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a resumable open is possible.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.dir.join(format!("{PRIMARY_RECORD}.json")).is_file()
    }

    /// Persist every record, creating the directory on first use.
    ///
    /// Record names containing path separators come from the far side of
    /// an external seam and are refused rather than trusted.
    pub fn save(&self, records: &[CredentialRecord]) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::credentials(&self.dir, e))?;
        for record in records {
            if !is_safe_name(&record.name) {
                warn!(name = record.name, "refusing credential record name");
                continue;
            }
            let path = self.dir.join(format!("{}.json", record.name));
            let data = serde_json::to_vec(&record.data)?;
            std::fs::write(&path, data).map_err(|e| Error::credentials(&path, e))?;
        }
        debug!(dir = %self.dir.display(), records = records.len(), "credentials persisted");
        Ok(())
    }

    /// Load all persisted records for a resumable open.
    pub fn load(&self) -> Result<Vec<CredentialRecord>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::credentials(&self.dir, e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::credentials(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = std::fs::read(&path).map_err(|e| Error::credentials(&path, e))?;
            records.push(CredentialRecord {
                name: name.to_string(),
                data: serde_json::from_slice(&raw)?,
            });
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    /// Delete the whole store. Called on an explicit logout.
    pub fn wipe(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                debug!(dir = %self.dir.display(), "credential store wiped");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::credentials(&self.dir, e)),
        }
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
}
