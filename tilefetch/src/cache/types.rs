//! Cache error type.

use std::path::PathBuf;
use thiserror::Error;

/// Cache-related errors.
///
/// These never fail a tile load; the loader logs them and carries on with an
/// uncached tile.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache path has no parent directory
    #[error("Cache path has no parent directory: {0}")]
    NoParent(PathBuf),
}
