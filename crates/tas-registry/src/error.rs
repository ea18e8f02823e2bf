//! Error types for registry access.

use thiserror::Error;

use tas_core::CoreError;

/// Errors returned by a [`Registry`](crate::Registry).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No document or metadata under the requested key.
    #[error("not found: {0}")]
    NotFound(String),

    /// The registry already holds the entry, or the new version does not
    /// follow the stored one.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The registry refused the request.
    #[error("registry rejected {operation} with status {status}: {body}")]
    Rejected {
        operation: String,
        status: u16,
        body: String,
    },

    /// The request did not complete in time.
    #[error("{0} timed out")]
    Timeout(String),

    /// The registry could not be reached or failed internally.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// The registry answered with a body we could not read.
    #[error("failed to decode registry response: {0}")]
    Decode(String),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
