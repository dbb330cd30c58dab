//! Error types for confpack-core

use std::path::PathBuf;

/// Result type for confpack-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in confpack-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] confpack_format::Error),

    #[error(transparent)]
    Fs(#[from] confpack_fs::Error),

    #[error("Not a valid package directory: {path}")]
    InvalidPackage { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
