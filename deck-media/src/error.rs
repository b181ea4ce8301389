//! Error types for the media pipeline.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while resolving, capturing, or exporting images.
///
/// All of these are recoverable at the editing-session level: callers degrade
/// (fallback value, skipped item) and report via notification rather than
/// crash.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Network failure while resolving a URL.
    #[error("Fetch failed for {url}: {reason}")]
    Fetch {
        /// The URL that could not be fetched.
        url: String,
        /// Underlying failure.
        reason: String,
    },

    /// Image bytes could not be decoded.
    #[error("Image decode failed: {0}")]
    ImageLoad(String),

    /// Card rasterization failed.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// PDF or JPEG encoding failed.
    #[error("Export failed: {0}")]
    Export(String),
}
