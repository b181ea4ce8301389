//! Error types for core store operations.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the element model and stores.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed element or card input at a validation boundary.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An element kind that the model does not know about.
    #[error("Unsupported element kind: {0}")]
    UnsupportedKind(String),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
