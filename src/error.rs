//! Error types for timing record operations
//!
//! An inactive gate is not an error: it selects the no-op strategy instead.
//! Everything else surfaces to the caller of `start`/`end` unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while recording timing events
#[derive(Error, Debug)]
pub enum BtError {
    /// No path-like `file:line` token could be extracted from the caller location
    #[error("Failed to resolve call site from location: {location:?}")]
    CallSite { location: String },

    /// Creating, aliasing, or appending to a record failed
    #[error("Record I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An alias refers to another alias instead of a record
    #[error("Alias {alias} refers to another alias")]
    AliasChain { alias: String },

    /// A process-wide instrumentation was already resolved
    #[error("Instrumentation already installed for this process")]
    AlreadyInstalled,
}

impl BtError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Underlying I/O error kind, if this is a record I/O failure
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

/// Result type for timing record operations
pub type Result<T> = std::result::Result<T, BtError>;
