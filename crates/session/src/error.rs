use std::path::PathBuf;

/// Crate-wide result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed session errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Could not reach or handshake with the bridge process.
    #[error("bridge connection failed: {message}")]
    Connect { message: String },

    /// The client reported a send failure or the confirmation timed out.
    #[error("send failed: {message}")]
    Send { message: String },

    /// The session event loop is gone; no further opens will happen.
    #[error("session loop stopped")]
    LoopStopped,

    /// Credential store I/O failed.
    #[error("credential store error at {path}: {source}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Wire (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn connect(message: impl std::fmt::Display) -> Self {
        Self::Connect {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn send(message: impl std::fmt::Display) -> Self {
        Self::Send {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn credentials(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Credentials {
            path: path.into(),
            source,
        }
    }
}
