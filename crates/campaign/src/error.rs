use std::path::PathBuf;

/// Crate-wide result type for campaign loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors for campaign input loading.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required campaign input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A campaign input file parsed to zero usable entries.
    #[error("{path} contains no usable entries")]
    EmptyInput { path: PathBuf },
}

impl Error {
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn empty_input(path: impl Into<PathBuf>) -> Self {
        Self::EmptyInput { path: path.into() }
    }
}
