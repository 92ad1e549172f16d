//! Error types for the access-control core.

use thiserror::Error;

/// The main error type for access-control operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An impersonation session failed validation.
    #[error("Invalid impersonation session: {0}")]
    InvalidSession(String),

    /// A tracked action was missing a required field.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Invalid element path or permission pattern format.
    #[error("Invalid element path: {0}")]
    InvalidPath(String),

    /// A backing store operation failed.
    #[error("Storage operation failed: {0}")]
    Storage(String),

    /// The audit sink rejected an entry.
    #[error("Audit sink failed: {0}")]
    Audit(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type alias for access-control operations.
pub type Result<T> = std::result::Result<T, Error>;
