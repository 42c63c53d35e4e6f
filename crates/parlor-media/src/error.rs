//! Error types for image reference operations.

/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Media error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid media type.
    #[error("Invalid media type: {0}")]
    InvalidMediaType(String),

    /// Data URI does not match `data:image/<type>;base64,<data>`.
    #[error("Invalid base64 image format: {0}")]
    InvalidDataUri(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Remote reference is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// String does not match any known reference form.
    #[error("Unsupported image reference: {0}")]
    UnsupportedReference(String),
}
