//! Error types for geotable operations.

use thiserror::Error;

/// Errors returned by geotable operations.
#[derive(Error, Debug)]
pub enum GeoTableError {
    /// Invalid caller input: out-of-range coordinates, bad radius,
    /// or a configuration that fails validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored geoJson payload failed to decode. Points written
    /// through this crate never produce this; it indicates the table
    /// was written to by something else.
    #[error("Invalid geoJson payload: {0}")]
    InvalidGeoJson(#[from] serde_json::Error),

    /// A storage-engine operation failed. Retry policy belongs to the
    /// caller; the error from the first failing range query is
    /// surfaced verbatim.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl GeoTableError {
    /// Wrap an arbitrary storage-engine error.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        GeoTableError::Storage(err.to_string())
    }
}

/// Result type alias for geotable operations.
pub type Result<T> = std::result::Result<T, GeoTableError>;
