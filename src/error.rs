//! Centralized error types for mboxscope.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxscope library.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified archive file does not exist.
    #[error("Archive file not found: {0}")]
    FileNotFound(PathBuf),

    /// An error from the underlying SQLite store.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The storage target already holds imported messages.
    ///
    /// Re-importing into a populated store is rejected: message keys are
    /// archive ordinals and would collide, and identity mappings are
    /// run-local. Import into a fresh database file instead.
    #[error("storage target already contains imported messages; import requires a fresh store")]
    StoreNotEmpty,

    /// A pipeline operation was invoked out of phase order.
    #[error("import pipeline is in phase '{actual}', expected '{expected}'")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// A report could not be generated.
    #[error("Report error: {0}")]
    Report(String),
}

/// Convenience alias for `Result<T, ScopeError>`.
pub type Result<T> = std::result::Result<T, ScopeError>;

impl ScopeError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `ScopeError`
/// when no path context is available (rare — prefer `ScopeError::io`).
impl From<std::io::Error> for ScopeError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
