//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Image reference or payload error.
    #[error("Media error: {0}")]
    Media(#[from] parlor_media::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Download produced no usable content.
    #[error("Download failed: {0}")]
    Download(String),

    /// Message not found.
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Message block not found.
    #[error("Message block not found: {0}")]
    BlockNotFound(String),

    /// Stored file not found.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
