//! Error types for storage areas.

use storage_area_core::KeyError;
use storage_area_host::HostError;
use thiserror::Error;

/// Errors that can occur during storage area operations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// A key failed validation. Raised before any database work starts.
    #[error("data error: {0}")]
    Data(#[from] KeyError),

    /// Areas require a secure context.
    #[error("security error: {0}")]
    Security(String),

    /// Error surfaced verbatim from the host database.
    #[error("host database error: {0}")]
    Host(#[from] HostError),
}

/// Result type for storage area operations.
pub type Result<T> = std::result::Result<T, StorageError>;
